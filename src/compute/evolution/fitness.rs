//! Direct fitness evaluation, bypassing the driving simulation.
//!
//! The simulation normally reports fitness through the engine's
//! `record_fitness`/`submit_fitness`. A [`FitnessFunction`] lets the engine
//! score networks itself, which is how benchmarks and offline training run.

use crate::compute::network::NeuralNetwork;
use crate::schema::LineageGroup;

/// Scores a network for a lineage group. Higher is better.
///
/// Called concurrently from worker threads, so implementations must be `Sync`.
pub trait FitnessFunction: Sync {
    fn evaluate(&self, group: &LineageGroup, network: &NeuralNetwork) -> f32;
}

impl<F> FitnessFunction for F
where
    F: Fn(&LineageGroup, &NeuralNetwork) -> f32 + Sync,
{
    fn evaluate(&self, group: &LineageGroup, network: &NeuralNetwork) -> f32 {
        self(group, network)
    }
}

/// Sum of absolute weights. Deterministic and unbounded, useful for
/// checking that selection makes progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightMagnitude;

impl FitnessFunction for WeightMagnitude {
    fn evaluate(&self, _group: &LineageGroup, network: &NeuralNetwork) -> f32 {
        network.parameters().map(f32::abs).sum()
    }
}

/// Fixed-input response: how closely the network's first output tracks a
/// target for a set of probe inputs. Scores are in `[-n, 0]` for `n` probes.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// Input vectors with the desired first output.
    pub probes: Vec<(Vec<f32>, f32)>,
}

impl FitnessFunction for ProbeResponse {
    fn evaluate(&self, _group: &LineageGroup, network: &NeuralNetwork) -> f32 {
        self.probes
            .iter()
            .map(|(inputs, target)| match network.forward(inputs) {
                Ok(outputs) => -(outputs[0] - target).abs().min(1.0),
                Err(_) => -1.0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Topology;

    #[test]
    fn test_weight_magnitude() {
        let network = NeuralNetwork::zeros(&Topology::new([2, 2])).unwrap();
        let group = LineageGroup::default();
        assert_eq!(WeightMagnitude.evaluate(&group, &network), 0.0);

        let export = {
            let mut export = network.to_export();
            export.weights[0] = vec![1.0, -2.0, 0.5, -0.5];
            export
        };
        let network = NeuralNetwork::from_export(&export).unwrap();
        assert!((WeightMagnitude.evaluate(&group, &network) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_closure_fitness() {
        let network = NeuralNetwork::zeros(&Topology::default()).unwrap();
        let group = LineageGroup::default();
        let fitness = |group: &LineageGroup, _: &NeuralNetwork| group.profile.tyre_grip * 2.0;
        assert!((fitness.evaluate(&group, &network) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_probe_response_perfect_for_zero_target() {
        let network = NeuralNetwork::zeros(&Topology::new([2, 1])).unwrap();
        let probes = ProbeResponse {
            probes: vec![(vec![1.0, 0.0], 0.0), (vec![0.0, 1.0], 0.0)],
        };
        assert_eq!(probes.evaluate(&LineageGroup::default(), &network), 0.0);
    }

    #[test]
    fn test_probe_response_penalizes_bad_shape() {
        let network = NeuralNetwork::zeros(&Topology::new([2, 1])).unwrap();
        let probes = ProbeResponse {
            probes: vec![(vec![1.0], 0.0)],
        };
        assert_eq!(probes.evaluate(&LineageGroup::default(), &network), -1.0);
    }
}

//! Fixed-topology feedforward network with tanh activations.
//!
//! Weights for the transition from layer `i` to layer `i + 1` are stored as a
//! `layer_sizes[i] × layer_sizes[i + 1]` matrix, so a forward step is the row
//! vector of the previous layer's values multiplied by that matrix.

use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::schema::{NetworkExport, Perturbation, Topology, TopologyError};

/// One layer transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Weight matrix (`inputs` × `outputs`).
    pub weights: Array2<f32>,
    /// Bias vector (`outputs`), when the topology enables biases.
    pub biases: Option<Array1<f32>>,
}

impl Layer {
    fn zeros(inputs: usize, outputs: usize, bias: bool) -> Self {
        Self {
            weights: Array2::zeros((inputs, outputs)),
            biases: bias.then(|| Array1::zeros(outputs)),
        }
    }

    fn random<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        bias: bool,
        range: f32,
        rng: &mut R,
    ) -> Self {
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-range..=range));
        let biases =
            bias.then(|| Array1::from_shape_fn(outputs, |_| rng.gen_range(-range..=range)));
        Self { weights, biases }
    }

    /// Performs this transition with tanh activation.
    #[inline]
    pub fn forward(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut output = inputs.dot(&self.weights);
        if let Some(biases) = &self.biases {
            output += biases;
        }
        output.mapv_inplace(f32::tanh);
        output
    }
}

/// Mutation parameters for a single child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationParams {
    /// Independent per-weight probability of perturbation.
    pub rate: f32,
    /// Perturbation magnitude.
    pub strength: f32,
    /// Noise distribution.
    pub perturbation: Perturbation,
}

impl MutationParams {
    /// Uniform perturbation in `[-strength, strength]` with probability `rate`.
    pub fn uniform(rate: f32, strength: f32) -> Self {
        Self {
            rate,
            strength,
            perturbation: Perturbation::Uniform,
        }
    }

    fn perturb<R: Rng + ?Sized>(&self, value: f32, rng: &mut R) -> f32 {
        if rng.r#gen::<f32>() >= self.rate || self.strength <= 0.0 {
            return value;
        }
        let noise = match self.perturbation {
            Perturbation::Uniform => rng.gen_range(-self.strength..=self.strength),
            Perturbation::Gaussian => rng.sample::<f32, _>(StandardNormal) * self.strength,
        };
        value + noise
    }
}

/// Network errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    #[error("Input has {actual} values but the input layer has {expected} neurons")]
    InputShapeMismatch { expected: usize, actual: usize },
    #[error("Invalid topology: {0}")]
    InvalidTopology(#[from] TopologyError),
    #[error("Layer {layer} has {actual} parameters, expected {expected}")]
    WeightShapeMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },
}

/// Fully-connected feedforward network.
///
/// Inference takes `&self` and touches no shared state, so one network can be
/// driven by any number of threads at once.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetwork {
    layer_sizes: Vec<usize>,
    layers: Vec<Layer>,
}

impl NeuralNetwork {
    /// Creates a network with every weight (and bias) set to zero.
    pub fn zeros(topology: &Topology) -> Result<Self, TopologyError> {
        topology.validate()?;
        let layers = topology
            .layer_sizes
            .windows(2)
            .map(|pair| Layer::zeros(pair[0], pair[1], topology.bias))
            .collect();

        Ok(Self {
            layer_sizes: topology.layer_sizes.clone(),
            layers,
        })
    }

    /// Creates a network with weights drawn uniformly from `±topology.init_range`.
    pub fn random<R: Rng + ?Sized>(
        topology: &Topology,
        rng: &mut R,
    ) -> Result<Self, TopologyError> {
        topology.validate()?;
        let layers = topology
            .layer_sizes
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], topology.bias, topology.init_range, rng))
            .collect();

        Ok(Self {
            layer_sizes: topology.layer_sizes.clone(),
            layers,
        })
    }

    /// Neuron count per layer.
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    /// Whether the layers carry biases.
    pub fn has_bias(&self) -> bool {
        self.layers.iter().any(|layer| layer.biases.is_some())
    }

    /// Layer transitions, input side first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Total number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.parameters().count()
    }

    /// Iterates over every weight, then every bias, layer by layer.
    pub fn parameters(&self) -> impl Iterator<Item = f32> + '_ {
        self.layers.iter().flat_map(|layer| {
            layer
                .weights
                .iter()
                .chain(layer.biases.iter().flat_map(|b| b.iter()))
                .copied()
        })
    }

    /// Runs a forward pass and returns the output layer.
    pub fn forward(&self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        let expected = self.layer_sizes[0];
        if inputs.len() != expected {
            return Err(NetworkError::InputShapeMismatch {
                expected,
                actual: inputs.len(),
            });
        }

        let mut activations = ArrayView1::from(inputs).to_owned();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        Ok(activations.to_vec())
    }

    /// Returns a mutated deep copy; `self` is never modified.
    pub fn mutate<R: Rng + ?Sized>(&self, params: MutationParams, rng: &mut R) -> NeuralNetwork {
        let mut child = self.clone();
        for layer in &mut child.layers {
            layer.weights.mapv_inplace(|w| params.perturb(w, rng));
            if let Some(biases) = &mut layer.biases {
                biases.mapv_inplace(|b| params.perturb(b, rng));
            }
        }
        child
    }

    /// Topology plus flat row-major parameter arrays.
    pub fn to_export(&self) -> NetworkExport {
        NetworkExport {
            layer_sizes: self.layer_sizes.clone(),
            bias: self.has_bias(),
            weights: self
                .layers
                .iter()
                .map(|layer| layer.weights.iter().copied().collect())
                .collect(),
            biases: self
                .layers
                .iter()
                .filter_map(|layer| layer.biases.as_ref().map(|b| b.to_vec()))
                .collect(),
        }
    }

    /// Rebuilds a network from its export, checking every array's length.
    pub fn from_export(export: &NetworkExport) -> Result<Self, NetworkError> {
        let topology = Topology::new(export.layer_sizes.clone()).with_bias(export.bias);
        topology.validate()?;

        let transitions = topology.transitions();
        if export.weights.len() != transitions {
            return Err(NetworkError::WeightShapeMismatch {
                layer: export.weights.len().min(transitions),
                expected: transitions,
                actual: export.weights.len(),
            });
        }
        let bias_layers = if export.bias { transitions } else { 0 };
        if export.biases.len() != bias_layers {
            return Err(NetworkError::WeightShapeMismatch {
                layer: export.biases.len().min(transitions),
                expected: bias_layers,
                actual: export.biases.len(),
            });
        }

        let mut layers = Vec::with_capacity(transitions);
        for (i, pair) in export.layer_sizes.windows(2).enumerate() {
            let (inputs, outputs) = (pair[0], pair[1]);
            let flat = &export.weights[i];
            let weights = Array2::from_shape_vec((inputs, outputs), flat.clone()).map_err(|_| {
                NetworkError::WeightShapeMismatch {
                    layer: i,
                    expected: inputs * outputs,
                    actual: flat.len(),
                }
            })?;

            let biases = match export.biases.get(i) {
                Some(b) if b.len() == outputs => Some(Array1::from(b.clone())),
                Some(b) => {
                    return Err(NetworkError::WeightShapeMismatch {
                        layer: i,
                        expected: outputs,
                        actual: b.len(),
                    });
                }
                None => None,
            };

            layers.push(Layer { weights, biases });
        }

        Ok(Self {
            layer_sizes: export.layer_sizes.clone(),
            layers,
        })
    }
}

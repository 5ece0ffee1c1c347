//! Network topology configuration.

use serde::{Deserialize, Serialize};

/// Fixed topology shared by every network of a lineage group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// Neuron count per layer: input, zero or more hidden layers, output.
    #[serde(default = "default_layer_sizes")]
    pub layer_sizes: Vec<usize>,
    /// Random weights are drawn uniformly from `[-init_range, init_range]`.
    #[serde(default = "default_init_range")]
    pub init_range: f32,
    /// Add a learned bias to every non-input neuron.
    #[serde(default)]
    pub bias: bool,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            layer_sizes: default_layer_sizes(),
            init_range: default_init_range(),
            bias: false,
        }
    }
}

/// Five car sensors, eight hidden neurons, four control outputs.
fn default_layer_sizes() -> Vec<usize> {
    vec![5, 8, 4]
}
fn default_init_range() -> f32 {
    1.0
}

impl Topology {
    /// Topology with the given layer sizes and default initialization.
    pub fn new(layer_sizes: impl Into<Vec<usize>>) -> Self {
        Self {
            layer_sizes: layer_sizes.into(),
            ..Default::default()
        }
    }

    /// Enable or disable per-neuron biases.
    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    /// Input layer width.
    #[inline]
    pub fn inputs(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    /// Output layer width.
    #[inline]
    pub fn outputs(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    /// Number of weight matrices (adjacent layer pairs).
    #[inline]
    pub fn transitions(&self) -> usize {
        self.layer_sizes.len().saturating_sub(1)
    }

    /// Total number of evolvable parameters.
    pub fn parameter_count(&self) -> usize {
        self.layer_sizes
            .windows(2)
            .map(|pair| pair[0] * pair[1] + if self.bias { pair[1] } else { 0 })
            .sum()
    }

    /// Validate layer sizes and the initialization range.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.layer_sizes.len() < 2 {
            return Err(TopologyError::TooFewLayers(self.layer_sizes.len()));
        }
        if let Some(layer) = self.layer_sizes.iter().position(|&n| n == 0) {
            return Err(TopologyError::EmptyLayer { layer });
        }
        if !self.init_range.is_finite() || self.init_range <= 0.0 {
            return Err(TopologyError::InvalidInitRange(self.init_range));
        }
        Ok(())
    }
}

/// Noise distribution used when a weight is selected for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Perturbation {
    /// Uniform in `[-strength, strength]`.
    #[default]
    Uniform,
    /// Normal with standard deviation `strength`.
    Gaussian,
}

/// Portable network representation: topology plus flat row-major weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkExport {
    /// Neuron count per layer.
    pub layer_sizes: Vec<usize>,
    /// Whether `biases` is populated.
    #[serde(default)]
    pub bias: bool,
    /// One `layer_sizes[i] * layer_sizes[i + 1]` array per transition,
    /// indexed `[input * outputs + output]`.
    pub weights: Vec<Vec<f32>>,
    /// One `layer_sizes[i + 1]` array per transition when `bias` is set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub biases: Vec<Vec<f32>>,
}

/// Topology validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("Topology needs at least 2 layers, got {0}")]
    TooFewLayers(usize),
    #[error("Layer {layer} has no neurons")]
    EmptyLayer { layer: usize },
    #[error("Initialization range must be positive and finite, got {0}")]
    InvalidInitRange(f32),
}

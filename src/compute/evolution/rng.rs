//! Seeded randomness for network initialization and parent selection.

use rand::prelude::*;

use crate::compute::network::NeuralNetwork;
use crate::schema::{Topology, TopologyError};

/// Random number generator wrapper for network operations.
pub struct NetworkRng {
    rng: StdRng,
}

impl NetworkRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create from an optional seed, falling back to entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::random, Self::new)
    }

    /// Generate a randomly initialized network.
    pub fn random_network(&mut self, topology: &Topology) -> Result<NeuralNetwork, TopologyError> {
        NeuralNetwork::random(topology, &mut self.rng)
    }

    /// Next raw seed, used to give each child its own generator.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform index in `0..upper`. `upper` must be non-zero.
    pub fn index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }

    /// Independent generator for one child.
    pub fn child_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }
}

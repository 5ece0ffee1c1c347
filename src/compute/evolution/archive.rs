//! Trained model export.
//!
//! At the end of training the best network of every lineage group is handed
//! off together with its car profile, so a race can be run with controllers
//! that were never part of the training loop.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compute::network::{NetworkError, NeuralNetwork};
use crate::schema::{CarProfile, LineageId, NetworkExport};

/// Best controller of one lineage group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub group: LineageId,
    pub profile: CarProfile,
    /// Last generation evaluated when the model was committed.
    pub generation: usize,
    pub fitness: f32,
    pub network: NetworkExport,
}

/// Trained models of a whole run, one per lineage group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainedModels {
    pub models: Vec<TrainedModel>,
}

impl TrainedModels {
    pub fn new(models: Vec<TrainedModel>) -> Self {
        Self { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model of a specific group.
    pub fn get(&self, group: LineageId) -> Option<&TrainedModel> {
        self.models.iter().find(|m| m.group == group)
    }

    /// Write as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Read models written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Rebuild runnable networks, checking every exported shape.
    pub fn into_networks(
        self,
    ) -> Result<Vec<(LineageId, CarProfile, NeuralNetwork)>, NetworkError> {
        self.models
            .into_iter()
            .map(|model| {
                let network = NeuralNetwork::from_export(&model.network)?;
                Ok((model.group, model.profile, network))
            })
            .collect()
    }
}

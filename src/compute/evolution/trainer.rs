//! Multi-group training.
//!
//! Each car profile gets its own [`EvolutionEngine`]; groups never exchange
//! genetic material. The trainer hands out tagged populations for the
//! environment to spawn and routes fitness back by [`LineageId`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use rayon::prelude::*;

use crate::compute::network::NeuralNetwork;
use crate::schema::{
    CarProfile, EvolutionConfig, EvolutionConfigError, EvolutionResult, GenerationReport,
    LineageGroup, LineageId, TrainingConfig,
};

use super::archive::{TrainedModel, TrainedModels};
use super::fitness::FitnessFunction;
use super::search::{EngineError, EvolutionEngine};

/// A network to spawn, tagged with where its fitness must be reported.
#[derive(Debug, Clone)]
pub struct TaggedNetwork {
    pub group: LineageId,
    pub slot: usize,
    pub network: Arc<NeuralNetwork>,
}

/// Owns one engine per lineage group.
pub struct Trainer {
    engines: Vec<EvolutionEngine>,
    cancelled: Arc<AtomicBool>,
}

impl Trainer {
    /// One engine per profile. Group `i` gets `LineageId(i)` and, for seeded
    /// runs, the seed `random_seed + i`.
    pub fn new(
        config: EvolutionConfig,
        profiles: Vec<CarProfile>,
    ) -> Result<Self, EvolutionConfigError> {
        if profiles.is_empty() {
            return Err(EvolutionConfigError::NoLineageGroups);
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let engines = profiles
            .into_iter()
            .enumerate()
            .map(|(index, profile)| {
                let mut group_config = config.clone();
                group_config.random_seed =
                    config.random_seed.map(|seed| seed.wrapping_add(index as u64));
                let group = LineageGroup::new(LineageId(index), profile);
                EvolutionEngine::new(group_config, group)
                    .map(|engine| engine.with_cancel_handle(Arc::clone(&cancelled)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("trainer created with {} lineage groups", engines.len());
        Ok(Self { engines, cancelled })
    }

    /// Build from a run configuration.
    pub fn from_config(config: &TrainingConfig) -> Result<Self, EvolutionConfigError> {
        config.validate()?;
        Self::new(config.evolution.clone(), config.profiles())
    }

    pub fn groups(&self) -> impl Iterator<Item = &LineageGroup> {
        self.engines.iter().map(EvolutionEngine::group)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Every network currently awaiting simulation, across all running groups.
    pub fn populations(&self) -> Vec<TaggedNetwork> {
        self.engines
            .iter()
            .filter(|engine| !engine.is_terminated())
            .flat_map(|engine| {
                let group = engine.group().id;
                engine
                    .population()
                    .iter()
                    .enumerate()
                    .map(move |(slot, agent)| TaggedNetwork {
                        group,
                        slot,
                        network: Arc::clone(&agent.network),
                    })
            })
            .collect()
    }

    pub fn engine(&self, id: LineageId) -> Result<&EvolutionEngine, EngineError> {
        self.engines.get(id.0).ok_or(EngineError::UnknownLineage(id))
    }

    pub fn engine_mut(&mut self, id: LineageId) -> Result<&mut EvolutionEngine, EngineError> {
        self.engines
            .get_mut(id.0)
            .ok_or(EngineError::UnknownLineage(id))
    }

    /// Report one agent's fitness.
    pub fn record_fitness(
        &mut self,
        id: LineageId,
        slot: usize,
        fitness: f32,
    ) -> Result<(), EngineError> {
        self.engine_mut(id)?.record_fitness(slot, fitness)
    }

    /// Stop every group at its next evaluation boundary.
    pub fn request_stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_finished(&self) -> bool {
        self.engines.iter().all(EvolutionEngine::is_terminated)
    }

    /// Advance every running group in parallel.
    ///
    /// Groups advance together or not at all: if any running group is still
    /// missing fitness (and no stop was requested), nothing is advanced.
    pub fn advance_all(&mut self) -> Result<Vec<GenerationReport>, EngineError> {
        for engine in self.engines.iter().filter(|e| !e.is_terminated()) {
            let missing = engine.pending_fitness();
            if missing > 0 && !engine.stop_requested() {
                return Err(EngineError::FitnessPending { missing });
            }
        }

        self.engines
            .par_iter_mut()
            .filter(|engine| !engine.is_terminated())
            .map(EvolutionEngine::advance_generation)
            .collect()
    }

    /// Train every group against `fitness` until each one stops.
    pub fn run<F: FitnessFunction + ?Sized>(
        &mut self,
        fitness: &F,
    ) -> Result<Vec<EvolutionResult>, EngineError> {
        let results = self
            .engines
            .par_iter_mut()
            .map(|engine| engine.run(fitness))
            .collect::<Result<Vec<_>, _>>()?;

        for result in &results {
            info!(
                "{}: {} generations, best fitness {:.4} ({:?})",
                result.group,
                result.stats.generations,
                result.stats.best_fitness,
                result.stats.stop_reason
            );
        }
        Ok(results)
    }

    /// Best committed network of every group that has one.
    pub fn trained_models(&self) -> TrainedModels {
        let models = self
            .engines
            .iter()
            .filter_map(|engine| {
                let best = engine.best()?;
                Some(TrainedModel {
                    group: engine.group().id,
                    profile: engine.group().profile.clone(),
                    generation: engine.history().len(),
                    fitness: best.fitness,
                    network: best.network.to_export(),
                })
            })
            .collect();
        TrainedModels::new(models)
    }
}

//! Generational evolution engine for one lineage group.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::compute::network::{MutationParams, NeuralNetwork};
use crate::schema::{
    AgentSnapshot, EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionPhase,
    EvolutionProgress, EvolutionResult, EvolutionStats, GenerationReport, LineageGroup, LineageId,
    StopReason,
};

use super::fitness::FitnessFunction;
use super::rng::NetworkRng;
use super::schedule::{EliteTrend, MutationSchedule};
use super::window::SimulationWindow;

/// An agent of the population.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Unique identifier within the lineage group.
    pub id: u64,
    /// The network. Elites share the handle with their previous generation.
    pub network: Arc<NeuralNetwork>,
    /// Fitness reported for the current generation.
    pub fitness: f32,
    /// Generation created.
    pub generation: usize,
    /// Parent ID.
    pub parents: Vec<u64>,
}

impl Agent {
    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            fitness: self.fitness,
            generation: self.generation,
            parents: self.parents.clone(),
            network: self.network.to_export(),
        }
    }
}

/// Engine errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Operation requires phase {expected:?}, engine is {actual:?}")]
    WrongPhase {
        expected: EvolutionPhase,
        actual: EvolutionPhase,
    },
    #[error("Slot {slot} out of range for population of {len}")]
    SlotOutOfRange { slot: usize, len: usize },
    #[error("Expected {expected} fitness values, got {actual}")]
    FitnessLengthMismatch { expected: usize, actual: usize },
    #[error("{missing} agents have not reported fitness")]
    FitnessPending { missing: usize },
    #[error("Fitness for slot {slot} is NaN")]
    InvalidFitness { slot: usize },
    #[error("Unknown lineage group {0}")]
    UnknownLineage(LineageId),
}

/// Evolution engine for one lineage group.
///
/// The environment reads [`population`](Self::population), reports fitness
/// while the engine is `Simulating`, then calls
/// [`advance_generation`](Self::advance_generation) once the window is over.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    group: LineageGroup,
    rng: NetworkRng,
    population: Vec<Agent>,
    recorded: Vec<bool>,
    window: SimulationWindow,
    schedule: MutationSchedule,
    history: EvolutionHistory,
    generation: usize,
    phase: EvolutionPhase,
    best: Option<Agent>,
    best_fitness: f32,
    stagnation_count: usize,
    stop_reason: Option<StopReason>,
    next_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create an engine, build the initial population and open the first window.
    pub fn new(
        config: EvolutionConfig,
        group: LineageGroup,
    ) -> Result<Self, EvolutionConfigError> {
        config.validate()?;

        let rng = NetworkRng::from_seed(config.random_seed);
        let schedule = MutationSchedule::new(&config.mutation);
        let size = config.population.size;
        let window = SimulationWindow::open(size, window_duration(&config), Instant::now());

        let mut engine = Self {
            config,
            group,
            rng,
            population: Vec::with_capacity(size),
            recorded: vec![false; size],
            window,
            schedule,
            history: EvolutionHistory::default(),
            generation: 1,
            phase: EvolutionPhase::Initializing,
            best: None,
            best_fitness: f32::NEG_INFINITY,
            stagnation_count: 0,
            stop_reason: None,
            next_id: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Share a cancellation flag with other engines.
    pub fn with_cancel_handle(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Ask the engine to stop at the next evaluation boundary.
    ///
    /// The flag is shared with every engine given the same handle through
    /// [`with_cancel_handle`](Self::with_cancel_handle). Inside a `Trainer`
    /// this stops all lineage groups, not just this one.
    pub fn request_stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether a stop has been requested on this engine's flag.
    pub fn stop_requested(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Number of agents that have not reported fitness this generation.
    pub fn pending_fitness(&self) -> usize {
        self.recorded.iter().filter(|&&done| !done).count()
    }

    fn initialize(&mut self) -> Result<(), EvolutionConfigError> {
        for _ in 0..self.config.population.size {
            let network = self.rng.random_network(&self.config.topology)?;
            let id = self.allocate_id();
            self.population.push(Agent {
                id,
                network: Arc::new(network),
                fitness: 0.0,
                generation: 1,
                parents: Vec::new(),
            });
        }

        self.phase = EvolutionPhase::Simulating;
        info!(
            "{}: initialized {} agents with topology {:?}",
            self.group.id,
            self.population.len(),
            self.config.topology.layer_sizes
        );
        Ok(())
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn expect_phase(&self, expected: EvolutionPhase) -> Result<(), EngineError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    pub fn group(&self) -> &LineageGroup {
        &self.group
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Current population, one agent per simulation slot.
    pub fn population(&self) -> &[Agent] {
        &self.population
    }

    /// Generation currently simulated (1-based).
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == EvolutionPhase::Terminated
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Current mutation rate.
    pub fn mutation_rate(&self) -> f32 {
        self.schedule.rate()
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    pub fn window(&self) -> &SimulationWindow {
        &self.window
    }

    /// Best agent of the last committed generation.
    pub fn best(&self) -> Option<&Agent> {
        self.best.as_ref()
    }

    /// Network of the best committed agent.
    pub fn best_network(&self) -> Option<Arc<NeuralNetwork>> {
        self.best.as_ref().map(|agent| Arc::clone(&agent.network))
    }

    /// Set one agent's fitness for the current generation.
    ///
    /// May be called repeatedly while simulating; the last value wins.
    pub fn record_fitness(&mut self, slot: usize, fitness: f32) -> Result<(), EngineError> {
        self.expect_phase(EvolutionPhase::Simulating)?;
        let len = self.population.len();
        let agent = self
            .population
            .get_mut(slot)
            .ok_or(EngineError::SlotOutOfRange { slot, len })?;
        if fitness.is_nan() {
            return Err(EngineError::InvalidFitness { slot });
        }
        agent.fitness = fitness;
        self.recorded[slot] = true;
        Ok(())
    }

    /// Set every agent's fitness at once, in slot order.
    pub fn submit_fitness(&mut self, fitness: &[f32]) -> Result<(), EngineError> {
        self.expect_phase(EvolutionPhase::Simulating)?;
        if fitness.len() != self.population.len() {
            return Err(EngineError::FitnessLengthMismatch {
                expected: self.population.len(),
                actual: fitness.len(),
            });
        }
        if let Some(slot) = fitness.iter().position(|f| f.is_nan()) {
            return Err(EngineError::InvalidFitness { slot });
        }
        for (slot, &value) in fitness.iter().enumerate() {
            self.record_fitness(slot, value)?;
        }
        Ok(())
    }

    /// An agent finished early. Returns whether every agent has now finished.
    pub fn notify_terminated(&mut self, slot: usize) -> Result<bool, EngineError> {
        self.expect_phase(EvolutionPhase::Simulating)?;
        if !self.window.mark_terminated(slot) {
            return Err(EngineError::SlotOutOfRange {
                slot,
                len: self.population.len(),
            });
        }
        let all_done = self.window.all_terminated();
        if all_done {
            debug!("{}: all agents terminated, window can close", self.group.id);
        }
        Ok(all_done)
    }

    /// Whether the current simulation window is over at `now`.
    pub fn window_closed(&self, now: Instant) -> bool {
        self.phase == EvolutionPhase::Simulating && self.window.is_closed(now)
    }

    /// Score every agent with `fitness` (in parallel) and close the window.
    pub fn evaluate_with<F: FitnessFunction + ?Sized>(
        &mut self,
        fitness: &F,
    ) -> Result<(), EngineError> {
        self.expect_phase(EvolutionPhase::Simulating)?;
        let group = &self.group;
        let scores: Vec<f32> = self
            .population
            .par_iter()
            .map(|agent| fitness.evaluate(group, &agent.network))
            .collect();

        self.submit_fitness(&scores)?;
        self.window.terminate_all();
        Ok(())
    }

    /// Rank the finished generation and produce the next one.
    ///
    /// Every agent must have reported fitness. If a stop was requested and the
    /// generation is incomplete, the engine terminates without committing it.
    pub fn advance_generation(&mut self) -> Result<GenerationReport, EngineError> {
        self.expect_phase(EvolutionPhase::Simulating)?;

        let cancelled = self.stop_requested();
        let missing = self.pending_fitness();
        if missing > 0 {
            if !cancelled {
                return Err(EngineError::FitnessPending { missing });
            }
            warn!(
                "{}: stopped during generation {} with {} agents unreported, keeping previous best",
                self.group.id, self.generation, missing
            );
            return Ok(self.terminate(StopReason::Cancelled, false));
        }

        self.phase = EvolutionPhase::Evaluating;
        let evaluated = self.generation;

        // Stable sort keeps equal-fitness agents in slot order
        let mut ranked = std::mem::take(&mut self.population);
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let elite_fitness = ranked[0].fitness;
        let n = ranked.len() as f32;
        let avg_fitness = ranked.iter().map(|a| a.fitness).sum::<f32>() / n;
        let variance = ranked
            .iter()
            .map(|a| (a.fitness - avg_fitness).powi(2))
            .sum::<f32>()
            / n;

        let trend = self.schedule.observe_elite(elite_fitness);
        if elite_fitness > self.best_fitness {
            self.best_fitness = elite_fitness;
        }
        match trend {
            EliteTrend::Improved => self.stagnation_count = 0,
            EliteTrend::Stagnated => self.stagnation_count += 1,
        }

        let rate = self.schedule.rate();
        let strength = self
            .schedule
            .strength(evaluated, self.config.population.max_generations);

        self.history.best_fitness.push(elite_fitness);
        self.history.avg_fitness.push(avg_fitness);
        self.history.fitness_std.push(variance.sqrt());
        self.history.mutation_rate.push(rate);
        self.history.mutation_strength.push(strength);
        self.best = Some(ranked[0].clone());

        info!(
            "{}: generation {} best={:.4} avg={:.4} rate={:.4} strength={:.4}",
            self.group.id, evaluated, elite_fitness, avg_fitness, rate, strength
        );

        self.generation += 1;
        if let Some(reason) = self.should_stop(cancelled) {
            self.population = ranked;
            let mut report = self.terminate(reason, true);
            report.elite_fitness = elite_fitness;
            report.avg_fitness = avg_fitness;
            report.mutation_rate = rate;
            report.mutation_strength = strength;
            return Ok(report);
        }

        self.population = self.breed(&ranked, rate, strength);
        self.recorded.fill(false);
        self.window = SimulationWindow::open(
            self.population.len(),
            window_duration(&self.config),
            Instant::now(),
        );
        self.phase = EvolutionPhase::Simulating;

        Ok(GenerationReport {
            group: self.group.id,
            generation: evaluated,
            committed: true,
            elite_fitness,
            avg_fitness,
            mutation_rate: rate,
            mutation_strength: strength,
            stagnation_count: self.stagnation_count,
            phase: self.phase,
        })
    }

    /// Elites first, then mutated offspring of parents from the selection pool.
    fn breed(&mut self, ranked: &[Agent], rate: f32, strength: f32) -> Vec<Agent> {
        let size = self.config.population.size;
        let elites = self.config.selection.elitism.min(ranked.len());
        let pool = self
            .config
            .selection
            .parent_selection
            .pool_size(ranked.len());

        let mut next_gen: Vec<Agent> = ranked
            .iter()
            .take(elites)
            .map(|elite| Agent {
                fitness: 0.0,
                ..elite.clone()
            })
            .collect();

        // Draw parents and child seeds sequentially so seeded runs reproduce
        let plans: Vec<(usize, u64)> = (next_gen.len()..size)
            .map(|_| (self.rng.index(pool), self.rng.next_seed()))
            .collect();

        let params = MutationParams {
            rate,
            strength,
            perturbation: self.config.mutation.perturbation,
        };
        let children: Vec<NeuralNetwork> = plans
            .par_iter()
            .map(|&(parent, seed)| {
                let mut rng = NetworkRng::child_rng(seed);
                ranked[parent].network.mutate(params, &mut rng)
            })
            .collect();

        for ((parent, _), network) in plans.iter().zip(children) {
            let id = self.allocate_id();
            next_gen.push(Agent {
                id,
                network: Arc::new(network),
                fitness: 0.0,
                generation: self.generation,
                parents: vec![ranked[*parent].id],
            });
        }

        next_gen
    }

    fn terminate(&mut self, reason: StopReason, committed: bool) -> GenerationReport {
        self.phase = EvolutionPhase::Terminated;
        self.stop_reason = Some(reason);
        info!(
            "{}: terminated after {} generations ({:?})",
            self.group.id,
            self.history.len(),
            reason
        );

        GenerationReport {
            group: self.group.id,
            generation: self.history.len(),
            committed,
            elite_fitness: self.best.as_ref().map_or(0.0, |b| b.fitness),
            avg_fitness: self.history.avg_fitness.last().copied().unwrap_or(0.0),
            mutation_rate: self.schedule.rate(),
            mutation_strength: self.history.mutation_strength.last().copied().unwrap_or(0.0),
            stagnation_count: self.stagnation_count,
            phase: self.phase,
        }
    }

    /// Check if evolution should stop after the latest evaluation.
    fn should_stop(&self, cancelled: bool) -> Option<StopReason> {
        if cancelled {
            return Some(StopReason::Cancelled);
        }

        if self.generation > self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = self.config.population.target_fitness
            && self.best_fitness >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            group: self.group.id,
            generation: self.generation,
            total_generations: self.config.population.max_generations,
            best_fitness: self.best_fitness,
            generation_best: self.history.best_fitness.last().copied().unwrap_or(0.0),
            avg_fitness: self.history.avg_fitness.last().copied().unwrap_or(0.0),
            mutation_rate: self.schedule.rate(),
            stagnation_count: self.stagnation_count,
            phase: self.phase,
        }
    }

    /// Run evolution against `fitness` with progress callback.
    pub fn run_with_callback<F, C>(
        &mut self,
        fitness: &F,
        callback: C,
    ) -> Result<EvolutionResult, EngineError>
    where
        F: FitnessFunction + ?Sized,
        C: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();
        callback(&self.progress());

        while !self.is_terminated() {
            self.evaluate_with(fitness)?;
            self.advance_generation()?;
            callback(&self.progress());
        }

        Ok(self.result(start_time.elapsed()))
    }

    /// Run evolution (blocking).
    pub fn run<F: FitnessFunction + ?Sized>(
        &mut self,
        fitness: &F,
    ) -> Result<EvolutionResult, EngineError> {
        self.run_with_callback(fitness, |_| {})
    }

    /// Summarize the run so far.
    pub fn result(&self, elapsed: Duration) -> EvolutionResult {
        let generations = self.history.len();
        EvolutionResult {
            group: self.group.id,
            best: self.best.as_ref().map(Agent::to_snapshot),
            stats: EvolutionStats {
                generations,
                total_evaluations: generations as u64 * self.config.population.size as u64,
                best_fitness: self.best_fitness,
                final_avg_fitness: self.history.avg_fitness.last().copied().unwrap_or(0.0),
                elapsed_seconds: elapsed.as_secs_f64(),
                stop_reason: self.stop_reason.unwrap_or(StopReason::Cancelled),
            },
            history: self.history.clone(),
        }
    }
}

fn window_duration(config: &EvolutionConfig) -> Duration {
    config.window.duration()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::{ProbeResponse, WeightMagnitude};
    use crate::schema::{
        MutationConfig, ParentSelection, PopulationConfig, RateSchedule, SelectionConfig,
        Topology,
    };

    fn test_config(size: usize, max_generations: usize) -> EvolutionConfig {
        EvolutionConfig {
            population: PopulationConfig {
                size,
                max_generations,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn engine(size: usize, max_generations: usize) -> EvolutionEngine {
        EvolutionEngine::new(test_config(size, max_generations), LineageGroup::default()).unwrap()
    }

    #[test]
    fn test_evolution_engine_creation() {
        let engine = engine(10, 5);
        assert_eq!(engine.population().len(), 10);
        assert_eq!(engine.phase(), EvolutionPhase::Simulating);
        assert_eq!(engine.generation(), 1);
        assert!(engine.best().is_none());
        assert!(engine.population().iter().all(|a| a.fitness == 0.0));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let result = EvolutionEngine::new(test_config(0, 5), LineageGroup::default());
        assert!(matches!(result, Err(EvolutionConfigError::EmptyPopulation)));

        let config = EvolutionConfig {
            topology: Topology::new([3]),
            ..test_config(4, 5)
        };
        let result = EvolutionEngine::new(config, LineageGroup::default());
        assert!(matches!(result, Err(EvolutionConfigError::InvalidTopology(_))));
    }

    #[test]
    fn test_advance_requires_all_fitness() {
        let mut engine = engine(3, 5);
        engine.record_fitness(0, 1.0).unwrap();
        assert_eq!(
            engine.advance_generation().unwrap_err(),
            EngineError::FitnessPending { missing: 2 }
        );
        assert_eq!(engine.phase(), EvolutionPhase::Simulating);
    }

    #[test]
    fn test_fitness_validation() {
        let mut engine = engine(3, 5);
        assert_eq!(
            engine.record_fitness(3, 1.0),
            Err(EngineError::SlotOutOfRange { slot: 3, len: 3 })
        );
        assert_eq!(
            engine.record_fitness(0, f32::NAN),
            Err(EngineError::InvalidFitness { slot: 0 })
        );
        assert_eq!(
            engine.submit_fitness(&[1.0, 2.0]),
            Err(EngineError::FitnessLengthMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_population_size_preserved() {
        let mut engine = engine(7, 10);
        for _ in 0..9 {
            let scores: Vec<f32> = (0..7).map(|i| i as f32).collect();
            engine.submit_fitness(&scores).unwrap();
            engine.advance_generation().unwrap();
            assert_eq!(engine.population().len(), 7);
            assert!(engine.population().iter().all(|a| a.fitness == 0.0));
        }
    }

    #[test]
    fn test_elite_carried_unchanged() {
        let mut engine = engine(5, 10);
        let best_slot = 3;
        let best_network = Arc::clone(&engine.population()[best_slot].network);
        let best_id = engine.population()[best_slot].id;

        let scores = [0.1, 0.5, 0.2, 0.9, 0.3];
        engine.submit_fitness(&scores).unwrap();
        engine.advance_generation().unwrap();

        let elite = &engine.population()[0];
        assert_eq!(elite.id, best_id);
        assert!(Arc::ptr_eq(&elite.network, &best_network));
        assert_eq!(elite.fitness, 0.0);
    }

    #[test]
    fn test_elite_does_not_regress_on_deterministic_fitness() {
        let mut engine = engine(6, 20);
        let mut previous_best = f32::NEG_INFINITY;
        while !engine.is_terminated() {
            engine.evaluate_with(&WeightMagnitude).unwrap();
            let report = engine.advance_generation().unwrap();
            assert!(report.elite_fitness >= previous_best);
            previous_best = report.elite_fitness;
        }
    }

    #[test]
    fn test_ties_keep_slot_order() {
        let mut engine = engine(4, 5);
        let first_id = engine.population()[0].id;
        engine.submit_fitness(&[0.0; 4]).unwrap();
        engine.advance_generation().unwrap();

        assert_eq!(engine.population()[0].id, first_id);
        assert_eq!(engine.best().unwrap().id, first_id);
    }

    #[test]
    fn test_offspring_parents_from_top_half() {
        let mut engine = engine(6, 5);
        let ids: Vec<u64> = engine.population().iter().map(|a| a.id).collect();
        // Slots 5, 4, 3 rank highest
        engine
            .submit_fitness(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        engine.advance_generation().unwrap();

        let top_half = [ids[5], ids[4], ids[3]];
        for child in &engine.population()[1..] {
            assert_eq!(child.parents.len(), 1);
            assert!(top_half.contains(&child.parents[0]));
            assert_eq!(child.generation, 2);
        }
    }

    #[test]
    fn test_best_only_selection() {
        let config = EvolutionConfig {
            selection: SelectionConfig {
                elitism: 1,
                parent_selection: ParentSelection::Best,
            },
            ..test_config(5, 5)
        };
        let mut engine = EvolutionEngine::new(config, LineageGroup::default()).unwrap();
        let best_id = engine.population()[2].id;
        engine.submit_fitness(&[0.0, 0.0, 9.0, 0.0, 0.0]).unwrap();
        engine.advance_generation().unwrap();

        for child in &engine.population()[1..] {
            assert_eq!(child.parents, vec![best_id]);
        }
    }

    #[test]
    fn test_single_agent_population() {
        let mut engine = engine(1, 5);
        let result = engine.run(&WeightMagnitude).unwrap();
        assert_eq!(engine.population().len(), 1);
        assert_eq!(result.stats.generations, 5);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
    }

    #[test]
    fn test_terminates_after_max_generations() {
        let mut engine = engine(4, 3);
        for generation in 1..=3 {
            assert_eq!(engine.generation(), generation);
            engine.submit_fitness(&[1.0, 2.0, 3.0, 4.0]).unwrap();
            engine.advance_generation().unwrap();
        }
        assert!(engine.is_terminated());
        assert_eq!(engine.stop_reason(), Some(StopReason::MaxGenerations));
        assert!(matches!(
            engine.advance_generation(),
            Err(EngineError::WrongPhase { .. })
        ));
        assert!(engine.record_fitness(0, 1.0).is_err());
    }

    #[test]
    fn test_cancellation_before_fitness_keeps_previous_best() {
        let mut engine = engine(4, 10);
        engine.submit_fitness(&[1.0, 4.0, 2.0, 3.0]).unwrap();
        engine.advance_generation().unwrap();
        let committed = engine.best().unwrap().id;

        engine.record_fitness(1, 100.0).unwrap();
        engine.request_stop();
        let report = engine.advance_generation().unwrap();

        assert!(!report.committed);
        assert_eq!(report.phase, EvolutionPhase::Terminated);
        assert_eq!(engine.stop_reason(), Some(StopReason::Cancelled));
        assert_eq!(engine.best().unwrap().id, committed);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_cancellation_with_complete_fitness_commits() {
        let mut engine = engine(3, 10);
        let cancel = engine.cancel_handle();
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run(&WeightMagnitude).unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 1);
        assert!(result.best.is_some());
    }

    #[test]
    fn test_window_closes_when_agents_terminate() {
        let mut engine = engine(2, 5);
        let now = Instant::now();
        assert!(!engine.window_closed(now));
        assert!(!engine.notify_terminated(0).unwrap());
        assert!(engine.window().is_terminated(0));
        assert!(engine.notify_terminated(1).unwrap());
        assert!(engine.window_closed(now));
        assert!(engine.notify_terminated(2).is_err());

        // Termination status resets with the next generation's window
        engine.submit_fitness(&[1.0, 2.0]).unwrap();
        engine.advance_generation().unwrap();
        assert!(!engine.window().is_terminated(0));
        assert_eq!(engine.window().running(), 2);
    }

    #[test]
    fn test_probe_fitness_drives_selection() {
        let mut engine = engine(8, 15);
        let fitness = ProbeResponse {
            probes: vec![
                (vec![1.0, 0.0, 0.0, 0.0, 0.0], 0.5),
                (vec![0.0, 1.0, 0.0, 0.0, 0.0], -0.5),
                (vec![0.0, 0.0, 1.0, 1.0, 1.0], 0.0),
            ],
        };

        let result = engine.run(&fitness).unwrap();
        let best = &result.history.best_fitness;
        assert_eq!(best.len(), 15);
        assert!(best.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!(best.iter().all(|&f| (-3.0..=0.0).contains(&f)));
        assert!(best[14] >= best[0]);
    }

    #[test]
    fn test_window_closes_at_deadline() {
        let engine = engine(2, 5);
        let deadline = engine.window().deadline();
        assert!(engine.window_closed(deadline));
        assert_eq!(
            deadline - engine.window().opened_at(),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_stagnation_limit() {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size: 3,
                max_generations: 100,
                stagnation_limit: Some(3),
                ..Default::default()
            },
            ..test_config(3, 100)
        };
        let mut engine = EvolutionEngine::new(config, LineageGroup::default()).unwrap();
        let constant = |_: &LineageGroup, _: &NeuralNetwork| 1.0f32;
        let result = engine.run(&constant).unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::Stagnation);
        assert_eq!(result.stats.generations, 4);
    }

    #[test]
    fn test_target_fitness() {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size: 4,
                max_generations: 100,
                target_fitness: Some(0.0),
                ..Default::default()
            },
            ..test_config(4, 100)
        };
        let mut engine = EvolutionEngine::new(config, LineageGroup::default()).unwrap();
        let result = engine.run(&WeightMagnitude).unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 1);
    }

    #[test]
    fn test_rate_adapts_to_elite_trend() {
        let mut engine = engine(4, 10);
        engine.submit_fitness(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        engine.advance_generation().unwrap();
        let after_improvement = engine.mutation_rate();
        assert!(after_improvement < 0.1);

        engine.submit_fitness(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        engine.advance_generation().unwrap();
        assert!(engine.mutation_rate() > after_improvement);
    }

    #[test]
    fn test_constant_rate_recorded_in_history() {
        let config = EvolutionConfig {
            mutation: MutationConfig {
                rate: RateSchedule::Constant { rate: 0.2 },
                ..Default::default()
            },
            ..test_config(4, 3)
        };
        let mut engine = EvolutionEngine::new(config, LineageGroup::default()).unwrap();
        let result = engine.run(&WeightMagnitude).unwrap();
        assert!(
            result
                .history
                .mutation_rate
                .iter()
                .all(|&r| (r - 0.2).abs() < 1e-6)
        );
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let mut a = engine(6, 8);
        let mut b = engine(6, 8);
        let ra = a.run(&WeightMagnitude).unwrap();
        let rb = b.run(&WeightMagnitude).unwrap();
        assert_eq!(ra.history.best_fitness, rb.history.best_fitness);
        assert_eq!(a.best_network(), b.best_network());
    }

    #[test]
    fn test_end_to_end_monotonic_best() {
        let config = EvolutionConfig {
            topology: Topology::new([5, 8, 4]),
            ..test_config(10, 50)
        };
        let mut engine = EvolutionEngine::new(config, LineageGroup::default()).unwrap();
        let result = engine.run(&WeightMagnitude).unwrap();

        assert_eq!(result.stats.generations, 50);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        let best = &result.history.best_fitness;
        assert_eq!(best.len(), 50);
        assert!(best.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!(best[49] > best[0]);
    }
}

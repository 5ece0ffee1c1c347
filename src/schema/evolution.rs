//! Evolution configuration types for training car controllers.
//!
//! This module provides the configuration of the generational loop
//! (population, selection, mutation schedules, simulation window) together
//! with the progress, history and result types the engine reports.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{LineageId, NetworkExport, Perturbation, Topology, TopologyError};

/// Top-level configuration for one lineage group's evolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Network topology shared by the whole population.
    #[serde(default)]
    pub topology: Topology,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Elitism and parent selection.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Mutation probability and magnitude schedules.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Simulation window settings.
    #[serde(default)]
    pub window: WindowConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of agents per lineage group.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations to simulate.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once the best elite fitness reaches this value.
    #[serde(default)]
    pub target_fitness: Option<f32>,
    /// Stop after this many generations without elite improvement.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

fn default_population_size() -> usize {
    10
}
fn default_max_generations() -> usize {
    100
}

/// Elitism and parent selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Number of top agents carried over unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
    /// How offspring parents are chosen.
    #[serde(default)]
    pub parent_selection: ParentSelection,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            elitism: default_elitism(),
            parent_selection: ParentSelection::default(),
        }
    }
}

fn default_elitism() -> usize {
    1
}

/// Parent selection policy for offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParentSelection {
    /// Uniform choice among the top half of the ranked population.
    #[default]
    TopHalf,
    /// Always the single best agent.
    Best,
}

impl ParentSelection {
    /// Number of ranked agents eligible as parents.
    ///
    /// Never zero for a non-empty population.
    pub fn pool_size(&self, population: usize) -> usize {
        let pool = match self {
            Self::TopHalf => (population / 2).max(1),
            Self::Best => 1,
        };
        pool.min(population.max(1))
    }
}

/// Mutation schedules.
///
/// The rate (per-weight probability) and the strength (perturbation magnitude)
/// are scheduled independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Per-weight mutation probability schedule.
    #[serde(default)]
    pub rate: RateSchedule,
    /// Perturbation magnitude schedule.
    #[serde(default)]
    pub strength: StrengthSchedule,
    /// Noise distribution.
    #[serde(default)]
    pub perturbation: Perturbation,
}

/// Mutation-rate schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RateSchedule {
    /// Shrink the rate while the elite improves, grow it while it stagnates.
    Adaptive {
        #[serde(default = "default_initial_rate")]
        initial: f32,
        #[serde(default = "default_rate_decay")]
        decay: f32,
        #[serde(default = "default_rate_growth")]
        growth: f32,
        #[serde(default = "default_min_rate")]
        min: f32,
        #[serde(default = "default_max_rate")]
        max: f32,
    },
    /// Fixed rate for the whole run.
    Constant {
        #[serde(default = "default_initial_rate")]
        rate: f32,
    },
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self::Adaptive {
            initial: default_initial_rate(),
            decay: default_rate_decay(),
            growth: default_rate_growth(),
            min: default_min_rate(),
            max: default_max_rate(),
        }
    }
}

fn default_initial_rate() -> f32 {
    0.1
}
fn default_rate_decay() -> f32 {
    0.9
}
fn default_rate_growth() -> f32 {
    1.1
}
fn default_min_rate() -> f32 {
    0.05
}
fn default_max_rate() -> f32 {
    0.3
}

/// Mutation-strength schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StrengthSchedule {
    /// Fixed magnitude.
    Constant {
        #[serde(default = "default_strength")]
        strength: f32,
    },
    /// Linear interpolation from `start` (first generation) to `end` (last).
    Linear { start: f32, end: f32 },
}

impl Default for StrengthSchedule {
    fn default() -> Self {
        Self::Constant {
            strength: default_strength(),
        }
    }
}

fn default_strength() -> f32 {
    0.1
}

/// Simulation window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Maximum wall-clock length of one generation's simulation.
    #[serde(default = "default_window_secs")]
    pub duration_secs: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_window_secs(),
        }
    }
}

fn default_window_secs() -> f32 {
    120.0
}

/// Longest accepted simulation window (one day).
pub const MAX_WINDOW_SECS: f32 = 86_400.0;

impl WindowConfig {
    /// Window length. Only meaningful for a validated configuration.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.duration_secs).unwrap_or(Duration::ZERO)
    }
}

// ============================================================================
// Progress and results
// ============================================================================

/// Serializable view of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Unique identifier within the lineage group.
    pub id: u64,
    /// Fitness in the generation it was ranked.
    pub fitness: f32,
    /// Generation the agent was created in.
    pub generation: usize,
    /// Parent ID (empty for the initial population).
    pub parents: Vec<u64>,
    /// The agent's network.
    pub network: NetworkExport,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f32>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f32>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f32>,
    /// Mutation rate applied to each generation's offspring.
    pub mutation_rate: Vec<f32>,
    /// Mutation strength applied to each generation's offspring.
    pub mutation_strength: Vec<f32>,
}

impl EvolutionHistory {
    /// Number of evaluated generations.
    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }
}

/// Phase of a lineage group's generational state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Creating the initial population.
    #[default]
    Initializing,
    /// Waiting for the environment to report fitness.
    Simulating,
    /// Ranking and producing the next generation.
    Evaluating,
    /// No further generations will be produced.
    Terminated,
}

/// Outcome of one generational transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Lineage group the report belongs to.
    pub group: LineageId,
    /// Generation that was evaluated.
    pub generation: usize,
    /// Whether the generation's ranking was committed.
    pub committed: bool,
    /// Fitness of the top-ranked agent.
    pub elite_fitness: f32,
    /// Mean fitness of the generation.
    pub avg_fitness: f32,
    /// Mutation rate used for the offspring.
    pub mutation_rate: f32,
    /// Mutation strength used for the offspring.
    pub mutation_strength: f32,
    /// Generations since the elite last improved.
    pub stagnation_count: usize,
    /// Phase after the transition.
    pub phase: EvolutionPhase,
}

/// Current progress of a lineage group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Lineage group.
    pub group: LineageId,
    /// Generation currently being simulated.
    pub generation: usize,
    /// Configured maximum generations.
    pub total_generations: usize,
    /// Best elite fitness so far.
    pub best_fitness: f32,
    /// Elite fitness of the last evaluated generation.
    pub generation_best: f32,
    /// Average fitness of the last evaluated generation.
    pub avg_fitness: f32,
    /// Current mutation rate.
    pub mutation_rate: f32,
    /// Generations since the elite last improved.
    pub stagnation_count: usize,
    /// Current phase.
    pub phase: EvolutionPhase,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Lineage group.
    pub group: LineageId,
    /// Best committed agent, if any generation was evaluated.
    pub best: Option<AgentSnapshot>,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations evaluated.
    pub generations: usize,
    /// Total fitness evaluations.
    pub total_evaluations: u64,
    /// Best elite fitness achieved.
    pub best_fitness: f32,
    /// Average fitness of the final evaluated generation.
    pub final_avg_fitness: f32,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target fitness.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// External stop request.
    Cancelled,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 1")]
    EmptyPopulation,
    #[error("Maximum generations must be at least 1")]
    InvalidGenerations,
    #[error("Elitism must keep at least one agent")]
    InvalidElitism,
    #[error("Invalid mutation rate: {0}")]
    InvalidRate(String),
    #[error("Invalid mutation schedule: {0}")]
    InvalidSchedule(String),
    #[error("Simulation window must be positive and at most one day")]
    InvalidWindow,
    #[error("At least one lineage group is required")]
    NoLineageGroups,
    #[error("Invalid topology: {0}")]
    InvalidTopology(#[from] TopologyError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.topology.validate()?;

        if self.population.size == 0 {
            return Err(EvolutionConfigError::EmptyPopulation);
        }
        if self.population.max_generations == 0 {
            return Err(EvolutionConfigError::InvalidGenerations);
        }
        if self.selection.elitism == 0 {
            return Err(EvolutionConfigError::InvalidElitism);
        }

        let check_rate = |value: f32, name: &str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidRate(format!(
                    "{} ({}) must be within [0, 1]",
                    name, value
                )))
            }
        };

        match self.mutation.rate {
            RateSchedule::Adaptive {
                initial,
                decay,
                growth,
                min,
                max,
            } => {
                check_rate(initial, "initial")?;
                check_rate(min, "min")?;
                check_rate(max, "max")?;
                if min > max {
                    return Err(EvolutionConfigError::InvalidRate(format!(
                        "min ({}) > max ({})",
                        min, max
                    )));
                }
                if !(decay > 0.0 && decay <= 1.0) {
                    return Err(EvolutionConfigError::InvalidSchedule(format!(
                        "decay ({}) must be within (0, 1]",
                        decay
                    )));
                }
                if !(growth >= 1.0 && growth.is_finite()) {
                    return Err(EvolutionConfigError::InvalidSchedule(format!(
                        "growth ({}) must be at least 1",
                        growth
                    )));
                }
            }
            RateSchedule::Constant { rate } => check_rate(rate, "rate")?,
        }

        let check_strength = |value: f32, name: &str| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidSchedule(format!(
                    "{} strength ({}) must be non-negative",
                    name, value
                )))
            }
        };

        match self.mutation.strength {
            StrengthSchedule::Constant { strength } => check_strength(strength, "constant")?,
            StrengthSchedule::Linear { start, end } => {
                check_strength(start, "start")?;
                check_strength(end, "end")?;
            }
        }

        let secs = self.window.duration_secs;
        if !(secs > 0.0 && secs <= MAX_WINDOW_SECS) {
            return Err(EvolutionConfigError::InvalidWindow);
        }

        Ok(())
    }
}

//! Generational neuroevolution of car controllers.
//!
//! # Overview
//!
//! - **Engine** (`search`): one lineage group's population, fitness intake,
//!   ranking, elitism and offspring production
//! - **Schedules** (`schedule`): adaptive mutation rate and strength schedule
//! - **Window** (`window`): per-generation deadline and termination tracking
//! - **Fitness** (`fitness`): pluggable scoring for offline training
//! - **Trainer** (`trainer`): one engine per car profile
//! - **Archive** (`archive`): trained model handoff
//!
//! # Example
//!
//! ```rust,no_run
//! use racer_evolution::compute::evolution::{EvolutionEngine, WeightMagnitude};
//! use racer_evolution::schema::{EvolutionConfig, LineageGroup};
//!
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), LineageGroup::default())
//!     .expect("valid config");
//! let result = engine
//!     .run_with_callback(&WeightMagnitude, |progress| {
//!         println!(
//!             "Generation {}: best fitness = {:.3}",
//!             progress.generation, progress.best_fitness
//!         );
//!     })
//!     .expect("engine is simulating");
//!
//! println!("Stopped: {:?}", result.stats.stop_reason);
//! ```
//!
//! Driven by a live simulation instead, the environment records fitness per
//! slot and advances once [`EvolutionEngine::window_closed`] reports true:
//!
//! ```rust,no_run
//! use std::time::Instant;
//! use racer_evolution::compute::evolution::EvolutionEngine;
//! use racer_evolution::schema::{EvolutionConfig, LineageGroup};
//!
//! let mut engine =
//!     EvolutionEngine::new(EvolutionConfig::default(), LineageGroup::default()).unwrap();
//! while !engine.is_terminated() {
//!     for slot in 0..engine.population().len() {
//!         engine.record_fitness(slot, 0.5).unwrap();
//!         engine.notify_terminated(slot).unwrap();
//!     }
//!     if engine.window_closed(Instant::now()) {
//!         engine.advance_generation().unwrap();
//!     }
//! }
//! ```

mod archive;
mod fitness;
mod rng;
mod schedule;
mod search;
mod trainer;
mod window;

pub use archive::{TrainedModel, TrainedModels};
pub use fitness::{FitnessFunction, ProbeResponse, WeightMagnitude};
pub use rng::NetworkRng;
pub use schedule::{EliteTrend, MutationSchedule};
pub use search::{Agent, EngineError, EvolutionEngine};
pub use trainer::{TaggedNetwork, Trainer};
pub use window::SimulationWindow;

//! Racer evolution - Neuroevolution of racing car controllers.
//!
//! Small fixed-topology tanh networks drive simulated cars. Each distinct car
//! profile forms a lineage group whose population is improved generation by
//! generation through elitism and weight mutation, with an adaptive mutation
//! rate. The environment runs the cars and reports fitness; this crate decides
//! which networks survive and how the next generation is made.
//!
//! # Architecture
//!
//! - `schema`: Configuration, car profiles and reporting types
//! - `compute`: The neural network and the evolution engine
//!
//! # Example
//!
//! ```rust,no_run
//! use racer_evolution::{
//!     compute::evolution::{Trainer, WeightMagnitude},
//!     schema::TrainingConfig,
//! };
//!
//! let config = TrainingConfig::default();
//! let mut trainer = Trainer::from_config(&config).unwrap();
//! trainer.run(&WeightMagnitude).unwrap();
//!
//! let models = trainer.trained_models();
//! models.save("trained_models.json").unwrap();
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::NeuralNetwork;
pub use compute::evolution::{EvolutionEngine, FitnessFunction, TrainedModels, Trainer};
pub use schema::{CarProfile, EvolutionConfig, LineageGroup, LineageId, Topology, TrainingConfig};

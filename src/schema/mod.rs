//! Schema module - Configuration, lineage and reporting types for racer evolution.

mod evolution;
mod network;
mod profile;
mod training;

pub use evolution::*;
pub use network::*;
pub use profile::*;
pub use training::*;

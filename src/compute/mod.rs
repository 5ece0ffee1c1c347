//! Compute module - Network inference and the evolutionary loop.

pub mod evolution;
mod network;

pub use network::*;

//! Car profiles and lineage groups.
//!
//! Every distinct car profile trains its own population. Groups are addressed
//! by a [`LineageId`] assigned once at creation, never by profile contents.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable identifier of a lineage group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineageId(pub usize);

impl fmt::Display for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Static car configuration, constant across generations for a lineage group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarProfile {
    /// Maximum speed (km/h).
    pub top_speed: f32,
    /// Acceleration rate (m/s²).
    pub acceleration: f32,
    /// Aerodynamic downforce (N).
    pub downforce: f32,
    /// Initial fuel (litres).
    pub fuel: f32,
    /// Tyre grip factor.
    pub tyre_grip: f32,
    /// Drag coefficient; lower is better.
    pub aero_efficiency: f32,
    /// Refuelling time (seconds).
    pub pit_stop_time: f32,
    /// Weather condition label.
    #[serde(default = "default_weather")]
    pub weather: String,
}

impl Default for CarProfile {
    fn default() -> Self {
        Self {
            top_speed: 200.0,
            acceleration: 10.0,
            downforce: 500.0,
            fuel: 50.0,
            tyre_grip: 1.0,
            aero_efficiency: 0.85,
            pit_stop_time: 2.5,
            weather: default_weather(),
        }
    }
}

fn default_weather() -> String {
    "Sunny".to_string()
}

impl CarProfile {
    /// Sample a profile from realistic ranges, rounded to two decimals.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut sample = |low: f32, high: f32| round2(rng.gen_range(low..=high));
        Self {
            top_speed: sample(20.0, 60.0),
            acceleration: sample(1.5, 5.5),
            downforce: sample(50.0, 200.0),
            fuel: sample(30.0, 100.0),
            tyre_grip: sample(0.7, 1.3),
            aero_efficiency: sample(0.75, 0.95),
            pit_stop_time: sample(2.5, 6.0),
            weather: default_weather(),
        }
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// An independently evolving sub-population's identity and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageGroup {
    pub id: LineageId,
    pub profile: CarProfile,
}

impl LineageGroup {
    pub fn new(id: LineageId, profile: CarProfile) -> Self {
        Self { id, profile }
    }
}

impl Default for LineageGroup {
    fn default() -> Self {
        Self::new(LineageId(0), CarProfile::default())
    }
}

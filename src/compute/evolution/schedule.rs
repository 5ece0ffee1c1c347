//! Mutation rate and strength schedules.

use log::debug;

use crate::schema::{MutationConfig, RateSchedule, StrengthSchedule};

/// Result of feeding an elite fitness into the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EliteTrend {
    /// Elite beat the previous generation's elite.
    Improved,
    /// Elite matched or fell below the previous elite.
    Stagnated,
}

/// Tracks the current mutation rate and derives the strength per generation.
#[derive(Debug, Clone)]
pub struct MutationSchedule {
    rate_schedule: RateSchedule,
    strength_schedule: StrengthSchedule,
    rate: f32,
    previous_elite: f32,
}

impl MutationSchedule {
    /// Create from configuration. The first elite is compared against 0.
    pub fn new(config: &MutationConfig) -> Self {
        let rate = match config.rate {
            RateSchedule::Adaptive { initial, min, max, .. } => initial.clamp(min, max),
            RateSchedule::Constant { rate } => rate,
        };

        Self {
            rate_schedule: config.rate.clone(),
            strength_schedule: config.strength.clone(),
            rate,
            previous_elite: 0.0,
        }
    }

    /// Current per-weight mutation probability.
    #[inline]
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Elite fitness of the last observed generation.
    #[inline]
    pub fn previous_elite(&self) -> f32 {
        self.previous_elite
    }

    /// Update the rate from a generation's elite fitness.
    pub fn observe_elite(&mut self, elite: f32) -> EliteTrend {
        let trend = if elite > self.previous_elite {
            EliteTrend::Improved
        } else {
            EliteTrend::Stagnated
        };

        if let RateSchedule::Adaptive {
            decay,
            growth,
            min,
            max,
            ..
        } = self.rate_schedule
        {
            let factor = match trend {
                EliteTrend::Improved => decay,
                EliteTrend::Stagnated => growth,
            };
            let previous = self.rate;
            self.rate = (self.rate * factor).clamp(min, max);
            debug!(
                "elite {:.4} vs {:.4}: {:?}, mutation rate {:.4} -> {:.4}",
                elite, self.previous_elite, trend, previous, self.rate
            );
        }

        self.previous_elite = elite;
        trend
    }

    /// Perturbation magnitude for offspring of `generation` (1-based).
    pub fn strength(&self, generation: usize, max_generations: usize) -> f32 {
        match self.strength_schedule {
            StrengthSchedule::Constant { strength } => strength,
            StrengthSchedule::Linear { start, end } => {
                let span = max_generations.saturating_sub(1).max(1) as f32;
                let t = (generation.saturating_sub(1) as f32 / span).clamp(0.0, 1.0);
                start + (end - start) * t
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adaptive() -> MutationSchedule {
        MutationSchedule::new(&MutationConfig::default())
    }

    #[test]
    fn test_initial_rate() {
        assert!((adaptive().rate() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_improvement_decays_rate() {
        let mut schedule = adaptive();
        assert_eq!(schedule.observe_elite(1.0), EliteTrend::Improved);
        assert!((schedule.rate() - 0.09).abs() < 1e-6);
    }

    #[test]
    fn test_stagnation_grows_rate() {
        let mut schedule = adaptive();
        schedule.observe_elite(1.0);
        assert_eq!(schedule.observe_elite(1.0), EliteTrend::Stagnated);
        assert!((schedule.rate() - 0.09 * 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_first_elite_compared_to_zero() {
        let mut schedule = adaptive();
        assert_eq!(schedule.observe_elite(-1.0), EliteTrend::Stagnated);
        assert!(schedule.rate() > 0.1);
    }

    #[test]
    fn test_increasing_elites_never_raise_rate() {
        let mut schedule = adaptive();
        let mut last = schedule.rate();
        for i in 1..60 {
            schedule.observe_elite(i as f32);
            assert!(schedule.rate() <= last);
            assert!(schedule.rate() >= 0.05);
            last = schedule.rate();
        }
        assert!((schedule.rate() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_stagnation_never_lowers_rate() {
        let mut schedule = adaptive();
        schedule.observe_elite(5.0);
        let mut last = schedule.rate();
        for _ in 0..40 {
            schedule.observe_elite(5.0);
            assert!(schedule.rate() >= last);
            assert!(schedule.rate() <= 0.3);
            last = schedule.rate();
        }
        assert!((schedule.rate() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_constant_rate_ignores_elites() {
        let config = MutationConfig {
            rate: RateSchedule::Constant { rate: 0.25 },
            ..Default::default()
        };
        let mut schedule = MutationSchedule::new(&config);
        schedule.observe_elite(10.0);
        schedule.observe_elite(1.0);
        assert!((schedule.rate() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_linear_strength() {
        let config = MutationConfig {
            strength: StrengthSchedule::Linear {
                start: 0.5,
                end: 0.1,
            },
            ..Default::default()
        };
        let schedule = MutationSchedule::new(&config);
        assert!((schedule.strength(1, 5) - 0.5).abs() < 1e-6);
        assert!((schedule.strength(3, 5) - 0.3).abs() < 1e-6);
        assert!((schedule.strength(5, 5) - 0.1).abs() < 1e-6);
        assert!((schedule.strength(9, 5) - 0.1).abs() < 1e-6);
        assert!((schedule.strength(1, 1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_constant_strength() {
        let schedule = adaptive();
        assert!((schedule.strength(1, 100) - 0.1).abs() < 1e-6);
        assert!((schedule.strength(100, 100) - 0.1).abs() < 1e-6);
    }
}

//! Simulation window bookkeeping.
//!
//! A window closes when its deadline passes or when every agent has reported
//! terminal status. The driver polls [`SimulationWindow::is_closed`]; nothing
//! here sleeps.

use std::time::{Duration, Instant};

/// Deadline and per-agent termination flags of one generation.
#[derive(Debug, Clone)]
pub struct SimulationWindow {
    opened_at: Instant,
    deadline: Instant,
    terminated: Vec<bool>,
}

impl SimulationWindow {
    /// Open a window for `agents` agents lasting at most `duration`.
    pub fn open(agents: usize, duration: Duration, now: Instant) -> Self {
        Self {
            opened_at: now,
            deadline: now + duration,
            terminated: vec![false; agents],
        }
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// Mark an agent finished. Returns `false` if the slot does not exist.
    pub fn mark_terminated(&mut self, slot: usize) -> bool {
        match self.terminated.get_mut(slot) {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    /// Mark every agent finished.
    pub fn terminate_all(&mut self) {
        self.terminated.fill(true);
    }

    pub fn is_terminated(&self, slot: usize) -> bool {
        self.terminated.get(slot).copied().unwrap_or(false)
    }

    /// Number of agents still running.
    pub fn running(&self) -> usize {
        self.terminated.iter().filter(|&&done| !done).count()
    }

    pub fn all_terminated(&self) -> bool {
        self.running() == 0
    }

    /// Whether the window is over at `now`.
    pub fn is_closed(&self, now: Instant) -> bool {
        now >= self.deadline || self.all_terminated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_closes_at_deadline() {
        let now = Instant::now();
        let window = SimulationWindow::open(3, Duration::from_secs(10), now);
        assert!(!window.is_closed(now));
        assert!(!window.is_closed(now + Duration::from_secs(9)));
        assert!(window.is_closed(now + Duration::from_secs(10)));
        assert_eq!(window.remaining(now + Duration::from_secs(4)), Duration::from_secs(6));
    }

    #[test]
    fn test_window_closes_when_all_terminated() {
        let now = Instant::now();
        let mut window = SimulationWindow::open(2, Duration::from_secs(60), now);
        assert!(window.mark_terminated(0));
        assert!(!window.is_closed(now));
        assert_eq!(window.running(), 1);
        assert!(window.mark_terminated(1));
        assert!(window.is_closed(now));
    }

    #[test]
    fn test_unknown_slot() {
        let mut window = SimulationWindow::open(1, Duration::from_secs(1), Instant::now());
        assert!(!window.mark_terminated(5));
        assert!(!window.is_terminated(5));
    }
}

//! Turn time tracking
//!
//! Turns carry a soft budget; the clock accumulates frame deltas and
//! reports whole elapsed seconds so persisted counters stay integral.

use std::time::Duration;

/// Default soft budget of one turn, in seconds.
pub const TIME_PER_TURN_SECS: u32 = 90;

/// Accumulates frame time against a per-turn budget.
#[derive(Debug, Clone)]
pub struct TurnClock {
    budget: Duration,
    turn_elapsed: Duration,
    total_elapsed: Duration,
    pending: Duration,
}

/// Result of feeding one frame delta into a [`TurnClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTick {
    /// Whole seconds completed by this delta.
    pub whole_seconds: u32,
    /// The turn budget ran out during this delta.
    pub expired: bool,
}

impl TurnClock {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            turn_elapsed: Duration::ZERO,
            total_elapsed: Duration::ZERO,
            pending: Duration::ZERO,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn turn_elapsed(&self) -> Duration {
        self.turn_elapsed
    }

    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.turn_elapsed)
    }

    /// Feed a frame delta. Expiry is reported once per turn.
    pub fn advance(&mut self, dt: Duration) -> ClockTick {
        let was_expired = self.turn_elapsed >= self.budget;
        self.turn_elapsed += dt;
        self.total_elapsed += dt;
        self.pending += dt;

        let whole_seconds = self.pending.as_secs() as u32;
        self.pending -= Duration::from_secs(whole_seconds as u64);

        ClockTick {
            whole_seconds,
            expired: !was_expired && self.turn_elapsed >= self.budget,
        }
    }

    /// Start the budget over for the next turn.
    pub fn reset_turn(&mut self) {
        self.turn_elapsed = Duration::ZERO;
    }

    /// Resume a turn that already consumed `elapsed` (e.g. after loading).
    pub fn resume(&mut self, elapsed: Duration) {
        self.turn_elapsed = elapsed;
    }
}

impl Default for TurnClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(TIME_PER_TURN_SECS as u64))
    }
}

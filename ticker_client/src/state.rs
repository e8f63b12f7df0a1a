//! Failure bookkeeping of one ticker instance.
//!
//! `TickerState` replaces free-floating counters: each aggregator owns one, and it is
//! written only from the refresh path. The consecutive-failure counter grows by one per
//! failed refresh cycle; reaching [`MAX_FAILURES`] switches the ticker into degraded
//! mode, and any successful cycle resets both.

/// Consecutive failed cycles after which the ticker degrades to synthetic data.
pub const MAX_FAILURES: u32 = 3;

/// Consecutive-failure counter and degraded-mode flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerState {
    consecutive_failures: u32,
    degraded: bool,
}

impl TickerState {
    /// Fresh state: no failures, live mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cycle that produced at least one live quote.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.degraded = false;
    }

    /// Records a failed cycle.
    ///
    /// Returns `true` exactly when this failure moved the ticker into degraded mode.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if !self.degraded && self.consecutive_failures >= MAX_FAILURES {
            self.degraded = true;
            return true;
        }
        false
    }

    /// Number of consecutive failed cycles.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// `true` while synthetic data is displayed instead of live data.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

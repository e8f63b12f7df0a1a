//! The ticker aggregator: fetch, substitute, degrade, render.
//!
//! Lifecycle of one `TickerAggregator`:
//! - `start` renders the static fallback table, so the display is never empty, then
//!   runs one refresh cycle.
//! - `run` additionally blocks on a [`Scheduler`] and runs one cycle per tick until the
//!   scheduler is cancelled.
//!
//! A refresh cycle asks the source for every configured symbol and fills gaps from the
//! fallback table, so the rendered list always covers all symbols. A cycle with at
//! least one live quote is a success and clears the failure state; a cycle with none
//! (or a failed/rate-limited call) counts as exactly one failure. On the
//! [`MAX_FAILURES`](crate::state::MAX_FAILURES)th consecutive failure the ticker
//! degrades and renders synthetic data immediately.
//!
//! While degraded, each tick renders synthetic data unless the [`RecoveryPolicy`] lets
//! it try the live source again. All randomness comes from the injected RNG, so a
//! seeded RNG makes every run reproducible.
use std::time::Duration;

use clap::ValueEnum;
use log::{error, info, warn};
use rand::Rng;
use strum_macros::{Display, EnumString};
use ticker_common::net::is_local_url;
use ticker_common::{FallbackTable, Quote};

use crate::render::{TickerDisplay, render};
use crate::scheduler::Scheduler;
use crate::source::QuoteSource;
use crate::state::TickerState;
use crate::synthetic;

/// Refresh interval when the proxy runs on the local machine.
pub const DEV_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
/// Refresh interval in production.
pub const PROD_REFRESH_INTERVAL: Duration = Duration::from_secs(300);
/// Chance per degraded tick to try the live source again.
pub const DEFAULT_RECOVERY_CHANCE: f64 = 0.3;

/// Deployment context, used to pick the refresh interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Environment {
    /// Proxy on localhost.
    Development,
    /// Anything else.
    Production,
}

impl Environment {
    /// Development when `proxy_url` points at the local machine.
    pub fn detect(proxy_url: &str) -> Self {
        if is_local_url(proxy_url) {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    /// Interval between two refresh cycles.
    pub fn refresh_interval(self) -> Duration {
        match self {
            Environment::Development => DEV_REFRESH_INTERVAL,
            Environment::Production => PROD_REFRESH_INTERVAL,
        }
    }
}

/// How the ticker leaves degraded mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryPolicy {
    /// Stay degraded until restart.
    Sticky,
    /// Try the live source on a tick with the given probability.
    Probabilistic(f64),
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        RecoveryPolicy::Probabilistic(DEFAULT_RECOVERY_CHANCE)
    }
}

/// Recovery policy names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumString)]
#[value(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecoveryMode {
    /// Probabilistic recovery with [`DEFAULT_RECOVERY_CHANCE`].
    Probabilistic,
    /// Never recover.
    Sticky,
}

impl From<RecoveryMode> for RecoveryPolicy {
    fn from(mode: RecoveryMode) -> Self {
        match mode {
            RecoveryMode::Probabilistic => RecoveryPolicy::default(),
            RecoveryMode::Sticky => RecoveryPolicy::Sticky,
        }
    }
}

/// Result of one fetch: a full quote list plus how much of it is live.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    /// One quote per configured symbol, in display order.
    pub quotes: Vec<Quote>,
    /// Quotes that came from the source.
    pub live: usize,
    /// Quotes taken from the fallback table.
    pub substituted: usize,
}

/// What a refresh cycle rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// At least one live quote; the rest substituted.
    Live {
        /// Live quotes rendered.
        live: usize,
        /// Fallback quotes rendered.
        substituted: usize,
    },
    /// No live quote; the fallback table was rendered.
    Failed,
    /// Synthetic data was rendered.
    Synthetic,
}

/// Keeps a display filled with quotes for a fixed set of symbols.
pub struct TickerAggregator<S, D, R> {
    table: FallbackTable,
    symbols: Vec<String>,
    source: S,
    display: D,
    rng: R,
    recovery: RecoveryPolicy,
    state: TickerState,
    last_quotes: Vec<Quote>,
}

impl<S, D, R> TickerAggregator<S, D, R>
where
    S: QuoteSource,
    D: TickerDisplay,
    R: Rng,
{
    /// Aggregator for the symbols of `table`.
    pub fn new(table: FallbackTable, source: S, display: D, rng: R) -> Self {
        let symbols = table.symbols();
        TickerAggregator {
            table,
            symbols,
            source,
            display,
            rng,
            recovery: RecoveryPolicy::default(),
            state: TickerState::new(),
            last_quotes: Vec::new(),
        }
    }

    /// Sets the recovery policy. Probabilities are clamped to `[0, 1]`.
    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = match recovery {
            RecoveryPolicy::Probabilistic(p) if p.is_nan() => RecoveryPolicy::Sticky,
            RecoveryPolicy::Probabilistic(p) => RecoveryPolicy::Probabilistic(p.clamp(0.0, 1.0)),
            RecoveryPolicy::Sticky => RecoveryPolicy::Sticky,
        };
        self
    }

    /// Renders the static table, then runs one refresh cycle.
    pub fn start(&mut self) -> CycleOutcome {
        let initial = self.table.quotes().to_vec();
        self.render(&initial);
        self.refresh()
    }

    /// `start`, then one refresh cycle per scheduler tick until it stops.
    pub fn run<T: Scheduler>(&mut self, scheduler: &mut T) {
        self.start();
        while scheduler.wait_tick() {
            self.refresh();
        }
        info!("Ticker stopped");
    }

    /// One refresh cycle.
    pub fn refresh(&mut self) -> CycleOutcome {
        if self.state.is_degraded() && !self.attempt_recovery() {
            self.render_synthetic();
            return CycleOutcome::Synthetic;
        }

        let report = self.fetch();
        if report.live > 0 {
            self.render(&report.quotes);
            return CycleOutcome::Live {
                live: report.live,
                substituted: report.substituted,
            };
        }

        if self.state.is_degraded() {
            self.render_synthetic();
            CycleOutcome::Synthetic
        } else {
            self.render(&report.quotes);
            CycleOutcome::Failed
        }
    }

    /// Fetches every configured symbol, substituting fallbacks for gaps, and updates
    /// the failure state.
    pub fn fetch(&mut self) -> FetchReport {
        let mut batch = match self.source.fetch(&self.symbols) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Fetch from {} failed: {}", self.source.name(), e);
                Default::default()
            }
        };

        let mut quotes = Vec::with_capacity(self.symbols.len());
        let mut live = 0;
        for symbol in &self.symbols {
            match batch.remove(symbol) {
                Some(quote) if quote.is_well_formed() => {
                    live += 1;
                    quotes.push(quote);
                }
                _ => {
                    if let Some(baseline) = self.table.get(symbol) {
                        quotes.push(baseline.clone());
                    }
                }
            }
        }
        let substituted = quotes.len() - live;

        if live > 0 {
            if self.state.is_degraded() {
                info!("Live data is back, leaving degraded mode");
            }
            self.state.record_success();
            if substituted > 0 {
                warn!("{} of {} symbols substituted from fallback", substituted, quotes.len());
            } else {
                info!("Refreshed {} symbols", live);
            }
        } else if self.state.record_failure() {
            error!(
                "{} consecutive failures, switching to synthetic data",
                self.state.consecutive_failures()
            );
        } else {
            warn!(
                "No live quotes ({} consecutive failures)",
                self.state.consecutive_failures()
            );
        }

        FetchReport {
            quotes,
            live,
            substituted,
        }
    }

    /// Renders `quotes` to the display. Display failures are logged only.
    pub fn render(&mut self, quotes: &[Quote]) {
        let frame = render(quotes, self.symbols.len());
        if let Err(e) = self.display.show(&frame) {
            error!("Failed to update ticker display: {}", e);
        }
        self.last_quotes = quotes.to_vec();
    }

    fn render_synthetic(&mut self) {
        let quotes = synthetic::generate(&self.table, &mut self.rng);
        self.render(&quotes);
    }

    fn attempt_recovery(&mut self) -> bool {
        match self.recovery {
            RecoveryPolicy::Sticky => false,
            RecoveryPolicy::Probabilistic(p) => self.rng.random_bool(p),
        }
    }

    /// Failure bookkeeping.
    pub fn state(&self) -> &TickerState {
        &self.state
    }

    /// Configured symbols in display order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Quotes of the most recent render.
    pub fn last_quotes(&self) -> &[Quote] {
        &self.last_quotes
    }

    /// The display sink.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// The quote source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

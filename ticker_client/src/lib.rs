//! Ticker data aggregator.
//!
//! Keeps a scrolling price display filled for a small, fixed set of symbols: live
//! quotes when a remote source answers, the static fallback table for symbols it
//! could not deliver, and perturbed synthetic data once the sources have failed
//! repeatedly.
//!
//! - `aggregator` — `TickerAggregator`, the refresh cycle and degradation policy.
//! - `state` — consecutive-failure counter and degraded-mode flag.
//! - `source` — the `QuoteSource` trait, HTTP providers and the fallback chain.
//! - `synthetic` — the randomized perturbation used in degraded mode.
//! - `render` — marquee HTML rendering and display sinks.
//! - `scheduler` — refresh timers with cancellable handles.
#![warn(missing_docs)]
pub mod aggregator;
pub mod render;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod synthetic;

pub use aggregator::{CycleOutcome, RecoveryPolicy, TickerAggregator};
pub use render::{TickerDisplay, TickerFrame};
pub use scheduler::{Scheduler, TickHandle};
pub use source::{QuoteBatch, QuoteSource};
pub use state::{MAX_FAILURES, TickerState};

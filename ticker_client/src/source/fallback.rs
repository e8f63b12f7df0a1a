//! Priority list of sources.
//!
//! Each source is asked only for the symbols still missing after the sources before
//! it; the walk stops as soon as every symbol is covered. The call fails only when no
//! source produced a single quote, in which case the last error is returned.
use log::{debug, warn};
use ticker_common::{Result, TickerError};

use super::{QuoteBatch, QuoteSource};

/// Sources tried in order until all symbols are covered.
pub struct FallbackSource {
    sources: Vec<Box<dyn QuoteSource>>,
}

impl FallbackSource {
    /// Composes `sources`, highest priority first.
    pub fn new(sources: Vec<Box<dyn QuoteSource>>) -> Self {
        FallbackSource { sources }
    }

    /// Number of composed sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// `true` if no source is configured.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl QuoteSource for FallbackSource {
    fn name(&self) -> &str {
        "fallback"
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch> {
        let mut batch = QuoteBatch::new();
        let mut last_error: Option<TickerError> = None;

        for source in &self.sources {
            let missing: Vec<String> = symbols
                .iter()
                .filter(|s| !batch.contains_key(*s))
                .cloned()
                .collect();
            if missing.is_empty() {
                break;
            }

            match source.fetch(&missing) {
                Ok(part) => {
                    debug!(
                        "{} delivered {}/{} symbols",
                        source.name(),
                        part.len(),
                        missing.len()
                    );
                    for (symbol, quote) in part {
                        if missing.contains(&symbol) {
                            batch.entry(symbol).or_insert(quote);
                        }
                    }
                }
                Err(e) => {
                    warn!("Source {} failed: {}", source.name(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if batch.is_empty() => Err(e),
            _ => Ok(batch),
        }
    }
}

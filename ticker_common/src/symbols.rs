//! Configured symbols, the static fallback table and provider symbol mapping.
//!
//! The fallback table holds one baseline [`Quote`] per configured symbol, in display
//! order. It is rendered before any live data arrives, substituted for symbols a
//! source could not deliver, and used as the basis of synthetic data.
use std::collections::HashSet;
use std::io::BufRead;

use crate::error::TickerError;
use crate::quote::Quote;
use crate::result::Result;

/// Symbols shown by default, in display order.
pub const DEFAULT_SYMBOLS: [&str; 9] = [
    "SPY", "AAPL", "MSFT", "NVDA", "META", "TSLA", "GOOGL", "BTC", "ETH",
];

/// Built-in baselines: symbol, price, change, change percent.
const BASELINES: &[(&str, &str, &str, &str)] = &[
    ("SPY", "512.34", "+2.15", "+0.42%"),
    ("AAPL", "175.34", "+1.23", "+0.71%"),
    ("MSFT", "415.56", "+3.45", "+0.84%"),
    ("NVDA", "875.28", "+15.67", "+1.82%"),
    ("META", "485.12", "-2.34", "-0.48%"),
    ("TSLA", "175.21", "-3.42", "-1.91%"),
    ("GOOGL", "152.78", "+0.95", "+0.63%"),
    ("PLTR", "24.56", "+0.87", "+3.67%"),
    ("GME", "14.22", "-0.31", "-2.13%"),
    ("BTC", "67540.28", "+2310.45", "+3.54%"),
    ("ETH", "3450.75", "+85.20", "+2.53%"),
    ("XRP", "0.5234", "-0.0112", "-2.09%"),
    ("DOGE", "0.1523", "+0.0041", "+2.77%"),
    ("SOL", "145.67", "+4.32", "+3.06%"),
];

/// Crypto display symbols and their CoinGecko ids.
const CRYPTO_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("XRP", "ripple"),
    ("DOGE", "dogecoin"),
    ("SOL", "solana"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("MATIC", "matic-network"),
    ("LINK", "chainlink"),
    ("AVAX", "avalanche-2"),
];

/// Suffix of USD crypto pairs on stock-style providers.
const USD_PAIR_SUFFIX: &str = "-USD";

/// Baseline quote for `symbol` from the built-in table.
pub fn builtin_baseline(symbol: &str) -> Option<Quote> {
    BASELINES
        .iter()
        .find(|(s, ..)| s.eq_ignore_ascii_case(symbol))
        .map(|(s, price, change, percent)| Quote::new(s, price, change, percent))
}

/// `true` for display symbols (or `-USD` pairs) of known crypto assets.
pub fn is_crypto(symbol: &str) -> bool {
    let upper = symbol.to_ascii_uppercase();
    upper.ends_with(USD_PAIR_SUFFIX) || coingecko_id(&upper).is_some()
}

/// CoinGecko id for a crypto display symbol.
pub fn coingecko_id(symbol: &str) -> Option<&'static str> {
    CRYPTO_IDS
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
        .map(|(_, id)| *id)
}

/// CoinGecko ids of every known crypto asset.
pub fn coingecko_ids() -> Vec<&'static str> {
    CRYPTO_IDS.iter().map(|(_, id)| *id).collect()
}

/// Display symbol for a CoinGecko id.
pub fn symbol_for_coingecko_id(id: &str) -> Option<&'static str> {
    CRYPTO_IDS.iter().find(|(_, i)| *i == id).map(|(s, _)| *s)
}

/// Symbol to request from stock-style providers: crypto maps to its USD pair.
pub fn provider_symbol(symbol: &str) -> String {
    let upper = symbol.to_ascii_uppercase();
    if coingecko_id(&upper).is_some() {
        format!("{}{}", upper, USD_PAIR_SUFFIX)
    } else {
        upper
    }
}

/// Display symbol for a provider symbol (`BTC-USD` becomes `BTC`).
pub fn display_symbol(provider_symbol: &str) -> String {
    let upper = provider_symbol.to_ascii_uppercase();
    match upper.strip_suffix(USD_PAIR_SUFFIX) {
        Some(base) => base.to_string(),
        None => upper,
    }
}

/// Ordered baseline quotes for the configured symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackTable {
    entries: Vec<Quote>,
}

impl FallbackTable {
    /// Table for [`DEFAULT_SYMBOLS`].
    pub fn default_symbols() -> Self {
        let entries = DEFAULT_SYMBOLS
            .iter()
            .filter_map(|s| builtin_baseline(s))
            .collect();
        FallbackTable { entries }
    }

    /// Table for the given symbols using built-in baselines.
    ///
    /// Fails with [`TickerError::SymbolNotFound`] for symbols without a baseline.
    pub fn for_symbols<S: AsRef<str>>(symbols: &[S]) -> Result<Self> {
        let mut entries: Vec<Quote> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.as_ref();
            let quote = builtin_baseline(symbol)
                .ok_or_else(|| TickerError::SymbolNotFound(symbol.to_string()))?;
            if !entries.iter().any(|q| q.symbol == quote.symbol) {
                entries.push(quote);
            }
        }
        Ok(FallbackTable { entries })
    }

    /// Table made of the given baselines, in order.
    pub fn from_quotes(entries: Vec<Quote>) -> Self {
        FallbackTable { entries }
    }

    /// Configured symbols in display order.
    pub fn symbols(&self) -> Vec<String> {
        self.entries.iter().map(|q| q.symbol.clone()).collect()
    }

    /// Baseline for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.entries.iter().find(|q| q.symbol == symbol)
    }

    /// All baselines in display order.
    pub fn quotes(&self) -> &[Quote] {
        &self.entries
    }

    /// Number of configured symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no symbol is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trait providing file parsing for the fallback table.
pub trait SymbolParser: Sized {
    /// Parses a table from a buffered reader.
    ///
    /// Each non-empty line not starting with `#` is either a bare symbol, which
    /// must have a built-in baseline, or `SYMBOL,price,change,changePercent`.
    /// Repeated symbols keep their first entry.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Self>;
}

impl SymbolParser for FallbackTable {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(TickerError::Io)?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }

            let quote = parse_line(trimmed_line).map_err(|e| {
                TickerError::ParseSymbolsFile(format!("line {}: {}", index + 1, e))
            })?;
            if seen.insert(quote.symbol.clone()) {
                entries.push(quote);
            }
        }

        if entries.is_empty() {
            return Err(TickerError::ParseSymbolsFile(
                "no symbols configured".to_string(),
            ));
        }
        Ok(FallbackTable { entries })
    }
}

fn parse_line(line: &str) -> Result<Quote, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    match fields.as_slice() {
        [symbol] => builtin_baseline(symbol)
            .ok_or_else(|| format!("symbol {} has no built-in baseline", symbol)),
        [symbol, price, change, percent] => {
            let quote = Quote::new(&symbol.to_ascii_uppercase(), price, change, percent);
            if quote.is_well_formed() {
                Ok(quote)
            } else {
                Err(format!("invalid baseline for {}", symbol))
            }
        }
        _ => Err(format!("expected 1 or 4 fields, got {}", fields.len())),
    }
}

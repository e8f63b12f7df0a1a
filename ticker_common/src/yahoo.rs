//! Yahoo Finance chart response decoding.
//!
//! Both the aggregator and the proxy read `chart.result[0].meta`: the current price
//! is `regularMarketPrice`, the reference price `chartPreviousClose` (or
//! `previousClose` when the former is absent).
use serde::Deserialize;

use crate::error::TickerError;
use crate::result::Result;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

/// Current and reference price extracted from a chart response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPrices {
    /// `regularMarketPrice`.
    pub price: f64,
    /// Previous close, `0.0` when the response carries none.
    pub previous_close: f64,
}

/// Decodes a chart response body for `symbol`.
pub fn parse_chart(symbol: &str, body: &str) -> Result<ChartPrices> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| TickerError::malformed(symbol, e.to_string()))?;

    if let Some(error) = response.chart.error {
        let reason = error.description.unwrap_or_else(|| "chart error".to_string());
        return Err(TickerError::malformed(symbol, reason));
    }

    let meta = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|r| r.meta)
        .ok_or_else(|| TickerError::malformed(symbol, "empty chart result"))?;

    let price = meta
        .regular_market_price
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| TickerError::malformed(symbol, "missing regularMarketPrice"))?;
    let previous_close = meta
        .chart_previous_close
        .or(meta.previous_close)
        .filter(|p| p.is_finite())
        .unwrap_or(0.0);

    Ok(ChartPrices {
        price,
        previous_close,
    })
}

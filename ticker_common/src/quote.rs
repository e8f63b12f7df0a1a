//! Quote data model shared by the aggregator and the proxy.
//!
//! A `Quote` is what the ticker displays for one symbol: the current price, the
//! absolute change against the reference price and the change expressed as a
//! percentage. All three values are kept as ready-to-display decimal strings
//! (`"175.34"`, `"+1.23"`, `"+0.71%"`), which is also their JSON wire form.
//!
//! Precision: prices below one unit keep four decimals so sub-cent assets are not
//! flattened to `0.00`; everything else carries two.
use serde::{Deserialize, Serialize};

/// Decimals used for regular prices and changes.
pub const PRICE_DECIMALS: usize = 2;
/// Decimals used when the price is below one unit.
pub const SUB_UNIT_DECIMALS: usize = 4;

/// Current price, change and change percentage for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Display symbol (e.g. `AAPL`, `BTC`).
    pub symbol: String,
    /// Current price as a decimal string.
    pub price: String,
    /// Signed absolute change against the reference price.
    pub change: String,
    /// Signed change percentage including the `%` suffix.
    pub change_percent: String,
}

impl Quote {
    /// Builds a quote from already formatted strings.
    pub fn new(symbol: &str, price: &str, change: &str, change_percent: &str) -> Self {
        Quote {
            symbol: symbol.to_string(),
            price: price.to_string(),
            change: change.to_string(),
            change_percent: change_percent.to_string(),
        }
    }

    /// Builds a quote from a current and a reference ("previous close") price.
    ///
    /// The change is `current - previous`; the percentage is computed against
    /// `previous` and is zero when no usable reference exists.
    pub fn from_prices(symbol: &str, current: f64, previous: f64) -> Self {
        let decimals = decimals_for(current);
        let usable = previous > 0.0 && previous.is_finite();
        let change = if usable { current - previous } else { 0.0 };
        let percent = if usable {
            (current / previous - 1.0) * 100.0
        } else {
            0.0
        };

        Quote {
            symbol: symbol.to_string(),
            price: format!("{:.*}", decimals, current),
            change: signed(change, decimals),
            change_percent: format!("{}%", signed(percent, PRICE_DECIMALS)),
        }
    }

    /// Parsed numeric price, `None` if the string is not a finite number.
    pub fn price_value(&self) -> Option<f64> {
        self.price.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Number of fraction digits in the price string.
    pub fn price_decimals(&self) -> usize {
        self.price
            .trim()
            .split_once('.')
            .map(|(_, frac)| frac.len())
            .unwrap_or(0)
    }

    /// A quote is positive unless its change carries a leading `-`.
    pub fn is_positive(&self) -> bool {
        !self.change.trim_start().starts_with('-')
    }

    /// `true` if every numeric field parses to a finite number, which is what a source
    /// must deliver.
    pub fn is_well_formed(&self) -> bool {
        let percent = self.change_percent.trim().trim_end_matches('%');
        !self.symbol.trim().is_empty()
            && self.price_value().is_some_and(|p| p > 0.0)
            && is_finite_number(&self.change)
            && is_finite_number(percent)
    }
}

/// Decimals to show for a price of the given magnitude.
pub fn decimals_for(price: f64) -> usize {
    if price.abs() < 1.0 && price != 0.0 {
        SUB_UNIT_DECIMALS
    } else {
        PRICE_DECIMALS
    }
}

fn is_finite_number(text: &str) -> bool {
    text.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

/// Formats `value` with an explicit sign: `+1.23`, `-0.50`.
pub fn signed(value: f64, decimals: usize) -> String {
    // -0.0 would otherwise print as "-0.00"
    let value = if value == 0.0 { 0.0 } else { value };
    if value < 0.0 {
        format!("{:.*}", decimals, value)
    } else {
        format!("+{:.*}", decimals, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_change_and_percent_from_previous_close() {
        let quote = Quote::from_prices("AAPL", 175.34, 174.11);
        assert_eq!(quote.price, "175.34");
        assert_eq!(quote.change, "+1.23");
        assert_eq!(quote.change_percent, "+0.71%");
        assert!(quote.is_positive());
    }

    #[test]
    fn negative_change_is_not_positive() {
        let quote = Quote::from_prices("TSLA", 240.00, 245.50);
        assert_eq!(quote.change, "-5.50");
        assert_eq!(quote.change_percent, "-2.24%");
        assert!(!quote.is_positive());
    }

    #[test]
    fn sub_unit_prices_keep_four_decimals() {
        let quote = Quote::from_prices("DOGE", 0.15234, 0.14911);
        assert_eq!(quote.price, "0.1523");
        assert_eq!(quote.change, "+0.0032");
        assert_eq!(quote.price_decimals(), 4);
    }

    #[test]
    fn missing_reference_yields_zero_change() {
        let quote = Quote::from_prices("SPY", 512.4, 0.0);
        assert_eq!(quote.change, "+0.00");
        assert_eq!(quote.change_percent, "+0.00%");
    }

    #[test]
    fn serializes_with_camel_case_percent() {
        let quote = Quote::new("BTC", "67540.28", "+2310.45", "+3.54%");
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["changePercent"], "+3.54%");

        let back: Quote = serde_json::from_str(
            r#"{"symbol":"BTC","price":"1.00","change":"-0.10","changePercent":"-9.09%","last_updated":"x"}"#,
        )
        .unwrap();
        assert!(!back.is_positive());
    }

    #[test]
    fn well_formed_requires_numeric_fields() {
        assert!(Quote::new("AAPL", "175.34", "+1.23", "+0.71%").is_well_formed());
        assert!(!Quote::new("AAPL", "n/a", "+1.23", "+0.71%").is_well_formed());
        assert!(!Quote::new("AAPL", "0", "+0", "+0%").is_well_formed());
        assert!(!Quote::new("", "1.00", "+0", "+0%").is_well_formed());
    }

    #[test]
    fn non_finite_change_is_not_well_formed() {
        assert!(!Quote::new("BTC", "100.00", "-inf", "-100.00%").is_well_formed());
        assert!(!Quote::new("BTC", "100.00", "+1.00", "NaN%").is_well_formed());
        assert!(!Quote::new("BTC", "inf", "+1.00", "+1.00%").is_well_formed());
    }

    #[test]
    fn infinite_reference_yields_zero_change() {
        let quote = Quote::from_prices("BTC", 100.0, f64::INFINITY);
        assert_eq!(quote.change, "+0.00");
        assert!(quote.is_well_formed());
    }

    #[test]
    fn signed_normalizes_negative_zero() {
        assert_eq!(signed(-0.0, 2), "+0.00");
        assert_eq!(signed(-0.5, 2), "-0.50");
    }
}

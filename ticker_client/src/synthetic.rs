//! Synthetic quotes for degraded mode.
//!
//! Each symbol's baseline price is moved by one random factor drawn from
//! `[-2%, +2%]`. The change and the change percentage are both derived from that single
//! move, so price, change and percentage always agree in direction. The move is
//! truncated toward zero at the baseline's precision, which keeps the displayed price
//! inside the band.
use rand::Rng;
use ticker_common::quote::{PRICE_DECIMALS, signed};
use ticker_common::{FallbackTable, Quote};

/// Largest relative move applied to a baseline price.
pub const MAX_PERTURBATION: f64 = 0.02;

/// Perturbs one baseline quote.
///
/// A baseline whose price does not parse is returned unchanged.
pub fn perturb<R: Rng>(baseline: &Quote, rng: &mut R) -> Quote {
    let Some(base) = baseline.price_value() else {
        return baseline.clone();
    };
    let decimals = baseline.price_decimals().max(PRICE_DECIMALS);
    let factor: f64 = rng.random_range(-MAX_PERTURBATION..=MAX_PERTURBATION);

    let scale = 10f64.powi(decimals as i32);
    let delta = (base * factor * scale).trunc() / scale;
    let percent = if base != 0.0 { delta / base * 100.0 } else { 0.0 };

    Quote {
        symbol: baseline.symbol.clone(),
        price: format!("{:.*}", decimals, base + delta),
        change: signed(delta, decimals),
        change_percent: format!("{}%", signed(percent, PRICE_DECIMALS)),
    }
}

/// One synthetic quote per entry of `table`, in table order.
pub fn generate<R: Rng>(table: &FallbackTable, rng: &mut R) -> Vec<Quote> {
    table.quotes().iter().map(|q| perturb(q, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn baseline() -> Quote {
        Quote::new("AAPL", "175.34", "+1.23", "+0.71%")
    }

    #[test]
    fn stays_within_band_and_agrees_in_direction() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = 175.34;
        for _ in 0..500 {
            let quote = perturb(&baseline(), &mut rng);
            let price = quote.price_value().unwrap();
            assert!((price - base).abs() <= base * MAX_PERTURBATION + 1e-9);

            let change: f64 = quote.change.parse().unwrap();
            assert!((price - (base + change)).abs() < 1e-6);
            let percent_negative = quote.change_percent.starts_with('-');
            assert_eq!(quote.is_positive(), !percent_negative);
            assert_eq!(quote.is_positive(), price >= base);
        }
    }

    #[test]
    fn same_seed_same_output() {
        let table = FallbackTable::default_symbols();
        let a = generate(&table, &mut StdRng::seed_from_u64(42));
        let b = generate(&table, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), table.len());
    }

    #[test]
    fn keeps_sub_unit_precision() {
        let doge = Quote::new("DOGE", "0.1523", "+0.0041", "+2.77%");
        let mut rng = StdRng::seed_from_u64(3);
        let quote = perturb(&doge, &mut rng);
        assert_eq!(quote.price_decimals(), 4);
    }

    #[test]
    fn unparsable_baseline_is_returned_unchanged() {
        let odd = Quote::new("ODD", "n/a", "+0", "+0%");
        assert_eq!(perturb(&odd, &mut StdRng::seed_from_u64(1)), odd);
    }
}

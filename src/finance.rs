//! Time-value-of-money and horizon calculations over canonical series.
//!
//! These functions are pure: scenario parameters come in as arguments and
//! nothing is written back into the parsed model.

pub const HORIZON_EPSILON: f64 = 1e-9;

/// End-of-year discounting: `sum(series[t] / (1 + rate)^t)`, with t starting at 0.
///
/// `rate` must be greater than -1. No range is enforced here; `rate = 0`
/// returns the plain sum.
pub fn present_value(rate: f64, series: &[f64]) -> f64 {
    let base = 1.0 + rate;
    series
        .iter()
        .enumerate()
        .map(|(t, value)| value / base.powi(t as i32))
        .sum()
}

/// Scales strictly positive entries by `factor`; costs (<= 0) are left as they are.
pub fn apply_price_factor(series: &[f64], factor: f64) -> Vec<f64> {
    series
        .iter()
        .map(|&v| if v > 0.0 { v * factor } else { v })
        .collect()
}

/// Copy of `series` zero-extended (or truncated) to `len`.
pub fn pad_to(series: &[f64], len: usize) -> Vec<f64> {
    let mut padded: Vec<f64> = series.iter().take(len).copied().collect();
    padded.resize(len, 0.0);
    padded
}

/// Last period index where either series carries a value above `epsilon` in
/// magnitude. Two all-zero or empty series give 0.
pub fn effective_horizon(cashflow: &[f64], carbon: &[f64], epsilon: f64) -> usize {
    let len = cashflow.len().max(carbon.len());
    let cashflow = pad_to(cashflow, len);
    let carbon = pad_to(carbon, len);

    (0..len)
        .rev()
        .find(|&k| cashflow[k].abs() > epsilon || carbon[k].abs() > epsilon)
        .unwrap_or(0)
}

/// Last index of a single series with a non-negligible value, 0 when there is none.
/// Used to trim trailing zero padding before charting.
pub fn last_nonzero_index(series: &[f64], epsilon: f64) -> usize {
    series
        .iter()
        .rposition(|v| v.abs() > epsilon)
        .unwrap_or(0)
}

pub fn carbon_total(carbon: &[f64]) -> f64 {
    carbon.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_value_zero_rate_is_sum() {
        let series = [-2_000_000.0, -545_540.0, 653_058.0, 1_306_171.0];
        let sum: f64 = series.iter().sum();
        assert!((present_value(0.0, &series) - sum).abs() < 1e-9);
    }

    #[test]
    fn test_present_value_discounts_from_period_zero() {
        let pv = present_value(0.10, &[-100.0, 110.0, 121.0]);
        assert!((pv - 100.0).abs() < 1e-9, "got {}", pv);
        assert_eq!(present_value(0.1, &[]), 0.0);
    }

    #[test]
    fn test_price_factor_identity_and_costs() {
        let series = vec![-5.0, 0.0, 3.0, 10.0];
        assert_eq!(apply_price_factor(&series, 1.0), series);

        let scaled = apply_price_factor(&series, 1.5);
        assert_eq!(scaled, vec![-5.0, 0.0, 4.5, 15.0]);
        assert_eq!(series, vec![-5.0, 0.0, 3.0, 10.0]);
    }

    #[test]
    fn test_effective_horizon() {
        assert_eq!(effective_horizon(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0], HORIZON_EPSILON), 0);
        assert_eq!(effective_horizon(&[10.0, 0.0, 0.0], &[0.0, 0.0, 5.0], HORIZON_EPSILON), 2);
        assert_eq!(effective_horizon(&[], &[], HORIZON_EPSILON), 0);
    }

    #[test]
    fn test_effective_horizon_uneven_lengths() {
        assert_eq!(effective_horizon(&[1.0], &[0.0, 0.0, 0.0, 2.0], HORIZON_EPSILON), 3);
        assert_eq!(effective_horizon(&[1.0, 1.0, 1e-12], &[], HORIZON_EPSILON), 1);
    }

    #[test]
    fn test_last_nonzero_index() {
        assert_eq!(last_nonzero_index(&[0.0, 4.0, 0.0, 0.0], HORIZON_EPSILON), 1);
        assert_eq!(last_nonzero_index(&[0.0, 0.0], HORIZON_EPSILON), 0);
    }

    #[test]
    fn test_pad_to() {
        assert_eq!(pad_to(&[1.0], 3), vec![1.0, 0.0, 0.0]);
        assert_eq!(pad_to(&[1.0, 2.0], 1), vec![1.0]);
    }
}

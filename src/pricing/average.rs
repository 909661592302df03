//! Outlier-filtered mean over price samples.
//!
//! A single vendor's listing spike must not distort a list's valuation,
//! so samples are trimmed with an interquartile-range filter before
//! averaging. The quartile estimator is the historical "lower/upper half
//! median" split, not the textbook linear-interpolation formula; every
//! stored valuation was produced by it, so it is preserved as-is.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// IQR-trimmed mean, rounded to 2 decimal places.
///
/// Empty input yields 0.00, as does the (degenerate) case where the
/// filter rejects every sample.
pub fn robust_average(samples: &[Decimal]) -> Decimal {
    if samples.is_empty() {
        return dec!(0.00);
    }

    let mut sorted = samples.to_vec();
    sorted.sort();

    let (q1, q3) = quartiles(&sorted);
    let iqr = q3 - q1;
    let lower = q1 - dec!(1.5) * iqr;
    let upper = q3 + dec!(1.5) * iqr;

    let kept: Vec<Decimal> = sorted
        .into_iter()
        .filter(|p| *p >= lower && *p <= upper)
        .collect();

    if kept.is_empty() {
        return dec!(0.00);
    }

    let sum: Decimal = kept.iter().sum();
    (sum / Decimal::from(kept.len())).round_dp(2)
}

/// First and third quartile via the half-median split.
///
/// With `mid = len / 2` and `k = mid / 2`: an odd-length sequence takes
/// the elements at `k` and `len-1-k` directly; an even-length sequence
/// averages the two elements straddling each of those positions, with
/// straddle indices clamped into range (a 2-element input therefore
/// yields Q1 = min, Q3 = max).
fn quartiles(sorted: &[Decimal]) -> (Decimal, Decimal) {
    let len = sorted.len();
    let k = (len / 2) / 2;
    let two = dec!(2);

    if len % 2 == 1 {
        (sorted[k], sorted[len - 1 - k])
    } else {
        let q1 = (sorted[k.saturating_sub(1)] + sorted[k]) / two;
        let hi = (len - k).min(len - 1);
        let q3 = (sorted[len - 1 - k] + sorted[hi]) / two;
        (q1, q3)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn avg(values: &[&str]) -> Decimal {
        let samples: Vec<Decimal> = values.iter().map(|v| v.parse().unwrap()).collect();
        robust_average(&samples)
    }

    #[test]
    fn test_empty_input_is_zero() {
        assert_eq!(robust_average(&[]), dec!(0.00));
    }

    #[test]
    fn test_single_sample_is_itself() {
        assert_eq!(avg(&["3.456"]), dec!(3.46));
        assert_eq!(avg(&["0"]), dec!(0.00));
    }

    #[test]
    fn test_two_samples_plain_mean() {
        // Q1 = min, Q3 = max, so both survive the filter.
        assert_eq!(avg(&["9.50", "10.00"]), dec!(9.75));
        assert_eq!(avg(&["1.00", "3.00"]), dec!(2.00));
    }

    #[test]
    fn test_three_samples_no_outliers() {
        // [3.00, 3.80, 4.00]: Q1=3.00, Q3=4.00, bounds [1.50, 5.50].
        assert_eq!(avg(&["3.00", "4.00", "3.80"]), dec!(3.60));
    }

    #[test]
    fn test_outlier_spike_excluded() {
        // [1,1,1,1,100]: Q1=Q3=1, bounds collapse to [1,1], the spike
        // is dropped and the mean of the remaining four is returned.
        assert_eq!(avg(&["1", "1", "1", "1", "100"]), dec!(1.00));
    }

    #[test]
    fn test_four_samples_even_split() {
        // [1,2,3,4]: Q1=(1+2)/2=1.5, Q3=(3+4)/2=3.5, IQR=2,
        // bounds [-1.5, 6.5] keep everything.
        assert_eq!(avg(&["1", "2", "3", "4"]), dec!(2.50));
    }

    #[test]
    fn test_even_count_with_outlier() {
        // [2,2,2,2,2,40]: Q1=2, Q3=(2+40)/2=21, IQR=19,
        // bounds [-26.5, 49.5] keep everything including the spike.
        // The half-median estimator is deliberately lax here.
        assert_eq!(avg(&["2", "2", "2", "2", "2", "40"]), dec!(8.33));
    }

    #[test]
    fn test_odd_count_tight_cluster_drops_spike() {
        // [5,5,5,5,5,5,80]: len 7, k=1, Q1=Q3=5, bounds [5,5].
        assert_eq!(avg(&["5", "5", "5", "5", "5", "5", "80"]), dec!(5.00));
    }

    #[test]
    fn test_order_irrelevant() {
        assert_eq!(avg(&["100", "1", "1", "1", "1"]), avg(&["1", "1", "100", "1", "1"]));
    }

    #[test]
    fn test_result_rounded_to_cents() {
        // (1 + 2) / 2 = 1.5; (1 + 1 + 2) / 3 = 1.333... -> 1.33
        assert_eq!(avg(&["1", "1", "2"]), dec!(1.33));
    }
}

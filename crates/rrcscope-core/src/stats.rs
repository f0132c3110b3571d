//! Descriptive-statistics and map-merge helpers used by aggregation.
//!
//! Pure functions, no state. Empty input degrades gracefully: mean and
//! standard deviation return `0.0` and the quartile vector returns five
//! zeros, so reports over sparse groups never fail.

use std::collections::BTreeMap;

/// Arithmetic mean; `0.0` for empty input.
///
/// # Examples
/// ```
/// assert_eq!(rrcscope_core::stats::mean(&[1.0, 2.0, 3.0]), 2.0);
/// assert_eq!(rrcscope_core::stats::mean(&[]), 0.0);
/// ```
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; `0.0` for empty input.
pub fn stdev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let diff_sum: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (diff_sum / values.len() as f64).sqrt()
}

/// Five-point distribution vector `[p5, q1, median, q3, p95]`.
///
/// The 5th and 95th percentiles are nearest-rank picks. Q1 and Q3 are the
/// medians of the lower and upper halves with the overall median excluded
/// from both, so `[1, 2, 3, 4, 5]` yields `q1 = 1.5` and `q3 = 4.5`.
/// Empty input returns five zeros.
pub fn quartiles(values: &[f64]) -> [f64; 5] {
    if values.is_empty() {
        return [0.0; 5];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN stats input"));

    let n = sorted.len();
    let p5 = sorted[(0.05 * n as f64) as usize];
    let p95 = sorted[(0.95 * n as f64) as usize];
    let med = median(&sorted);
    let (q1, q3) = if n == 1 {
        (sorted[0], sorted[0])
    } else {
        (median(&sorted[..n / 2]), median(&sorted[n - n / 2..]))
    };
    [p5, q1, med, q3, p95]
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Append values into a keyed list map, creating lists on demand.
pub fn merge_values<K: Ord, V>(
    target: &mut BTreeMap<K, Vec<V>>,
    source: impl IntoIterator<Item = (K, V)>,
) {
    for (key, value) in source {
        target.entry(key).or_default().push(value);
    }
}

/// Extend keyed lists with already-listed values.
pub fn merge_value_lists<K: Ord, V>(
    target: &mut BTreeMap<K, Vec<V>>,
    source: impl IntoIterator<Item = (K, Vec<V>)>,
) {
    for (key, values) in source {
        target.entry(key).or_default().extend(values);
    }
}

/// Render a millisecond offset as `H:MM:SS.mmm`.
pub fn format_clock(ms: i64) -> String {
    let millis = ms % 1000;
    let seconds = (ms / 1000) % 60;
    let minutes = (ms / 60_000) % 60;
    let hours = ms / 3_600_000;
    format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stdev_of_empty_input_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(stdev(&[]), 0.0);
    }

    #[test]
    fn stdev_matches_population_formula() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((stdev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quartiles_of_empty_input_are_zero() {
        assert_eq!(quartiles(&[]), [0.0; 5]);
    }

    #[test]
    fn quartiles_of_singleton_collapse_to_the_value() {
        assert_eq!(quartiles(&[7.0]), [7.0; 5]);
    }

    #[test]
    fn quartiles_exclude_the_median_from_both_halves() {
        let q = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(q[1], 1.5);
        assert_eq!(q[2], 3.0);
        assert_eq!(q[3], 4.5);

        let q = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(q[1], 2.0);
        assert_eq!(q[2], 3.5);
        assert_eq!(q[3], 5.0);

        let q = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(q[1], 2.0);
        assert_eq!(q[2], 4.0);
        assert_eq!(q[3], 6.0);

        let q = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(q[1], 2.5);
        assert_eq!(q[2], 4.5);
        assert_eq!(q[3], 6.5);
    }

    #[test]
    fn percentile_picks_are_nearest_rank() {
        let values: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let q = quartiles(&values);
        assert_eq!(q[0], 2.0);
        assert_eq!(q[4], 20.0);
    }

    #[test]
    fn merge_helpers_accumulate_keyed_lists() {
        let mut target: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        merge_values(&mut target, [("a".to_string(), 1), ("b".to_string(), 2)]);
        merge_values(&mut target, [("a".to_string(), 3)]);
        assert_eq!(target["a"], vec![1, 3]);
        assert_eq!(target["b"], vec![2]);

        merge_value_lists(&mut target, [("b".to_string(), vec![4, 5])]);
        assert_eq!(target["b"], vec![2, 4, 5]);
    }

    #[test]
    fn clock_formatting_pads_components() {
        assert_eq!(format_clock(0), "0:00:00.000");
        assert_eq!(format_clock(3_723_456), "1:02:03.456");
        assert_eq!(format_clock(59_999), "0:00:59.999");
    }
}

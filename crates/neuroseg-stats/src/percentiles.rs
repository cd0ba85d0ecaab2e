//! Nearest-rank percentiles of sorted data.

/// Computes a single percentile value from sorted data.
///
/// Uses the nearest-rank method: for `n` values the k-th percentile is the
/// value at position `floor(n * k / 100)`, clamped to the last element.
///
/// Returns `f64::NAN` if the input is empty.
///
/// # Examples
///
/// ```
/// use neuroseg_stats::percentiles::compute_percentile;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(compute_percentile(&values, 50.0), 3.0);
/// assert_eq!(compute_percentile(&values, 25.0), 2.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }
    let idx = ((sorted_values.len() as f64 * percentile.clamp(0.0, 100.0)) / 100.0) as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

/// First quartile, median and third quartile of sorted data.
///
/// All three are `NaN` for an empty input.
#[must_use]
pub fn quartiles(sorted_values: &[f64]) -> [f64; 3] {
    [25.0, 50.0, 75.0].map(|p| compute_percentile(sorted_values, p))
}

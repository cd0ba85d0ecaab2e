use serde::{Deserialize, Serialize};

use crate::percentiles;

/// Descriptive statistics summarizing a dataset.
///
/// Contains common measures of central tendency, dispersion and spread for a
/// dataset of `f64` values. Variance is the population variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// Number of (non-NaN) values summarized.
    pub count: usize,
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean of the dataset.
    pub mean: f64,
    /// Nearest-rank first quartile.
    pub q1: f64,
    /// Nearest-rank median.
    pub median: f64,
    /// Nearest-rank third quartile.
    pub q3: f64,
    /// The variance of the dataset.
    pub variance: f64,
    /// The standard deviation of the dataset.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// NaN values are skipped. Returns `None` if no value remains.
    ///
    /// # Examples
    ///
    /// ```
    /// # use neuroseg_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, f64::NAN, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.count, 5);
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.median, 3.0);
    /// assert_eq!((stats.q1, stats.q3), (2.0, 4.0));
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted, NaN-free values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let [q1, median, q3] = percentiles::quartiles(sorted_values);
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            count,
            min,
            max,
            mean,
            q1,
            median,
            q3,
            variance,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_none() {
        assert!(DescriptiveStats::new(std::iter::empty()).is_none());
        assert!(DescriptiveStats::new([f64::NAN, f64::NAN]).is_none());
    }

    #[test]
    fn test_constant_values_have_zero_spread() {
        let stats = DescriptiveStats::new([2.5; 8]).unwrap();
        assert_eq!(stats.count, 8);
        assert!(stats.variance.abs() < 1e-12);
        assert!((stats.mean - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_population_variance() {
        let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.variance - 4.0).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
    }
}

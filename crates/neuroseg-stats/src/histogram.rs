use std::{f64::consts::TAU, ops::Range};

use serde::{Deserialize, Serialize};

use crate::circular::wrap_angle;

/// Equal-width bin edges over a closed interval.
///
/// Edges are computed once from the global range of a feature and then shared
/// by every per-group histogram, so bars of different groups line up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    /// Creates `num_bins` equal-width bins covering `[min, max]`.
    ///
    /// Returns `None` if `num_bins` is zero, the bounds are not finite, or
    /// `max < min`. A degenerate range (`min == max`) is widened to a unit
    /// interval centered on the value.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(min: f64, max: f64, num_bins: usize) -> Option<Self> {
        if num_bins == 0 || !min.is_finite() || !max.is_finite() || max < min {
            return None;
        }
        let (min, max) = if max - min < f64::EPSILON * min.abs().max(1.0) {
            (min - 0.5, min + 0.5)
        } else {
            (min, max)
        };
        let width = (max - min) / num_bins as f64;
        let mut edges = (0..num_bins)
            .map(|i| min + width * i as f64)
            .collect::<Vec<_>>();
        // Exact upper bound avoids accumulated rounding on the last edge
        edges.push(max);
        Some(Self { edges })
    }

    /// Creates bin edges spanning the finite range of `values`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use neuroseg_stats::histogram::BinEdges;
    /// let edges = BinEdges::spanning([3.0, 1.0, f64::NAN, 5.0], 2).unwrap();
    /// assert_eq!(edges.as_slice(), &[1.0, 3.0, 5.0]);
    /// ```
    #[must_use]
    pub fn spanning<I>(values: I, num_bins: usize) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        Self::new(min, max, num_bins)
    }

    /// Creates `num_wedges` equal angular wedges over `[0, 2π)`.
    #[must_use]
    pub fn angular(num_wedges: usize) -> Option<Self> {
        Self::new(0.0, TAU, num_wedges)
    }

    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.edges.len() - 1
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.edges
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Returns the index of the bin containing `value`.
    ///
    /// Bins are half-open except the last one, which also includes the upper
    /// edge. Values outside the edges (and NaN) have no bin.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    #[must_use]
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        let (min, max) = (self.min(), self.max());
        if value.is_nan() || value < min || value > max {
            return None;
        }
        let num_bins = self.num_bins();
        let position = (value - min) / (max - min) * num_bins as f64;
        let mut idx = (position.floor() as usize).min(num_bins - 1);
        // Correct for rounding near interior edges
        if value < self.edges[idx] {
            idx -= 1;
        } else if idx + 1 < num_bins && value >= self.edges[idx + 1] {
            idx += 1;
        }
        Some(idx)
    }
}

/// A histogram over explicit bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// The bins comprising the histogram, in ascending order.
    pub bins: Vec<HistogramBin>,
    /// Number of values that fell outside the edges or were NaN.
    pub out_of_range: u64,
}

/// A single bin in a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// The range of values covered by this bin (inclusive start, exclusive end;
    /// the last bin also includes its end).
    pub range: Range<f64>,
    /// The number of values that fall within this bin's range.
    pub count: u64,
}

impl Histogram {
    /// Creates a histogram with all counts set to zero.
    #[must_use]
    pub fn empty(edges: &BinEdges) -> Self {
        let bins = edges
            .as_slice()
            .windows(2)
            .map(|w| HistogramBin {
                range: w[0]..w[1],
                count: 0,
            })
            .collect();
        Self {
            bins,
            out_of_range: 0,
        }
    }

    /// Counts `values` into the bins defined by `edges`.
    #[must_use]
    pub fn with_edges<I>(edges: &BinEdges, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut histogram = Self::empty(edges);
        for value in values {
            match edges.bin_index(value) {
                Some(idx) => histogram.bins[idx].count += 1,
                None => histogram.out_of_range += 1,
            }
        }
        histogram
    }

    /// Counts angles into `num_wedges` equal wedges over `[0, 2π)`.
    ///
    /// Angles are wrapped into `[0, 2π)` first, so `-π/2` lands in the same
    /// wedge as `3π/2`. Returns an empty histogram if `num_wedges` is zero.
    #[must_use]
    pub fn angular<I>(angles: I, num_wedges: usize) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let Some(edges) = BinEdges::angular(num_wedges) else {
            return Self {
                bins: vec![],
                out_of_range: 0,
            };
        };
        Self::with_edges(&edges, angles.into_iter().map(wrap_angle))
    }

    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        self.bins.iter().map(|bin| bin.count).collect()
    }

    /// Total number of values counted into bins.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|bin| bin.count).sum()
    }

    #[must_use]
    pub fn max_count(&self) -> u64 {
        self.bins.iter().map(|bin| bin.count).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn test_invalid_edges() {
        assert!(BinEdges::new(0.0, 1.0, 0).is_none());
        assert!(BinEdges::new(1.0, 0.0, 3).is_none());
        assert!(BinEdges::new(f64::NAN, 1.0, 3).is_none());
        assert!(BinEdges::spanning([f64::NAN], 3).is_none());
    }

    #[test]
    fn test_degenerate_range_is_widened() {
        let edges = BinEdges::spanning([2.0, 2.0, 2.0], 4).unwrap();
        assert!((edges.min() - 1.5).abs() < 1e-12);
        assert!((edges.max() - 2.5).abs() < 1e-12);
        let histogram = Histogram::with_edges(&edges, [2.0, 2.0, 2.0]);
        assert_eq!(histogram.total(), 3);
    }

    #[test]
    fn test_upper_edge_is_inclusive() {
        let edges = BinEdges::new(0.0, 10.0, 5).unwrap();
        assert_eq!(edges.bin_index(10.0), Some(4));
        assert_eq!(edges.bin_index(0.0), Some(0));
        assert_eq!(edges.bin_index(2.0), Some(1));
        assert_eq!(edges.bin_index(10.5), None);
        assert_eq!(edges.bin_index(f64::NAN), None);
    }

    #[test]
    fn test_out_of_range_is_counted_separately() {
        let edges = BinEdges::new(0.0, 1.0, 2).unwrap();
        let histogram = Histogram::with_edges(&edges, [0.25, 0.75, 2.0, f64::NAN]);
        assert_eq!(histogram.counts(), vec![1, 1]);
        assert_eq!(histogram.out_of_range, 2);
    }

    #[test]
    fn test_angular_wedges() {
        let histogram = Histogram::angular(
            [0.1, FRAC_PI_2 + 0.1, PI + 0.1, -FRAC_PI_2 + 0.1, 2.0 * PI],
            4,
        );
        assert_eq!(histogram.counts(), vec![2, 1, 1, 1]);
        assert_eq!(histogram.out_of_range, 0);
    }

    #[test]
    fn test_angular_zero_wedges_is_empty() {
        let histogram = Histogram::angular([0.0, 1.0], 0);
        assert!(histogram.bins.is_empty());
    }

    #[test]
    fn test_spanning_edges_count_every_value() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        for num_bins in 1..20 {
            let values = (0..200)
                .map(|_| rng.random_range(-50.0..50.0))
                .collect::<Vec<f64>>();
            let edges = BinEdges::spanning(values.iter().copied(), num_bins).unwrap();
            let histogram = Histogram::with_edges(&edges, values.iter().copied());
            assert_eq!(histogram.total(), 200);
            assert_eq!(histogram.out_of_range, 0);
            for value in &values {
                let idx = edges.bin_index(*value).unwrap();
                let range = &histogram.bins[idx].range;
                assert!(range.start <= *value && *value <= range.end);
            }
        }
    }
}

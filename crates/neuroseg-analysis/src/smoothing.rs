//! One-dimensional Gaussian smoothing along the time axis.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// How the filter extends a signal past its ends.
///
/// Neither mode pads with zeros, so smoothed values near the edges keep the
/// signal's level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    /// Repeat the edge sample (`a a a | a b c d | d d d`).
    #[default]
    Nearest,
    /// Mirror about the edge, repeating the edge sample (`c b a | a b c d | d c b`).
    Reflect,
}

impl EdgeMode {
    /// Maps a possibly out-of-range index into `0..len`.
    fn resolve(self, index: isize, len: usize) -> usize {
        #[expect(clippy::cast_possible_wrap)]
        let n = len as isize;
        let resolved = match self {
            EdgeMode::Nearest => index.clamp(0, n - 1),
            EdgeMode::Reflect => {
                let m = index.rem_euclid(2 * n);
                if m >= n { 2 * n - 1 - m } else { m }
            }
        };
        usize::try_from(resolved).unwrap_or_default()
    }
}

/// Normalized Gaussian weights with radius `round(4 * sigma)`.
///
/// A non-positive `sigma` yields the identity kernel `[1.0]`.
///
/// # Examples
///
/// ```
/// use neuroseg_analysis::smoothing::gaussian_kernel;
///
/// let kernel = gaussian_kernel(1.0);
/// assert_eq!(kernel.len(), 9);
/// assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
/// assert_eq!(gaussian_kernel(0.0), vec![1.0]);
/// ```
#[must_use]
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return vec![1.0];
    }
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = (4.0 * sigma + 0.5).floor() as usize;
    #[expect(clippy::cast_precision_loss)]
    let weights = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect::<Vec<_>>();
    let total = weights.iter().sum::<f64>();
    weights.into_iter().map(|w| w / total).collect()
}

/// Convolves `signal` with a Gaussian of width `sigma` samples.
///
/// The output has the same length as the input. Missing (NaN) samples stay
/// missing and are left out of their neighbors' weighted sums, with the
/// remaining weights renormalized.
#[must_use]
pub fn gaussian_filter(signal: &[f64], sigma: f64, mode: EdgeMode) -> Vec<f64> {
    let kernel = gaussian_kernel(sigma);
    if kernel.len() == 1 || signal.is_empty() {
        return signal.to_vec();
    }
    #[expect(clippy::cast_possible_wrap)]
    let radius = (kernel.len() / 2) as isize;
    (0..signal.len())
        .map(|i| {
            if signal[i].is_nan() {
                return f64::NAN;
            }
            #[expect(clippy::cast_possible_wrap)]
            let center = i as isize;
            let (sum, weight) = kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(w, offset)| (w, signal[mode.resolve(center + offset, signal.len())]))
                .filter(|(_, v)| !v.is_nan())
                .fold((0.0, 0.0), |(sum, weight), (w, v)| (sum + w * v, weight + w));
            sum / weight
        })
        .collect()
}

/// Smooths every column of `matrix` independently along the row axis.
#[must_use]
pub fn smooth_columns(matrix: &DMatrix<f64>, sigma: f64, mode: EdgeMode) -> DMatrix<f64> {
    let mut smoothed = matrix.clone();
    for (mut out, column) in smoothed.column_iter_mut().zip(matrix.column_iter()) {
        let values = column.iter().copied().collect::<Vec<_>>();
        for (dst, src) in out.iter_mut().zip(gaussian_filter(&values, sigma, mode)) {
            *dst = src;
        }
    }
    smoothed
}

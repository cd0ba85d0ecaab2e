//! Statistics of angular data.
//!
//! Linear statistics are meaningless for directions: the mean of `0.1` and
//! `2π - 0.1` is `π`, while the directions they describe are nearly equal.
//! [`CircularStats`] averages unit vectors instead.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// Circular mean and concentration of a set of angles (radians).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularStats {
    /// Number of (non-NaN) angles summarized.
    pub count: usize,
    /// Direction of the mean resultant vector, in `[0, 2π)`.
    pub mean_direction: f64,
    /// Length of the mean resultant vector, in `[0, 1]`.
    ///
    /// Close to 1 when angles are concentrated, close to 0 when they are
    /// spread uniformly around the circle.
    pub resultant_length: f64,
}

impl CircularStats {
    /// Computes circular statistics, skipping NaN angles.
    ///
    /// Returns `None` if no angle remains.
    ///
    /// # Examples
    ///
    /// ```
    /// # use neuroseg_stats::circular::CircularStats;
    /// use std::f64::consts::TAU;
    ///
    /// let stats = CircularStats::new([0.1, TAU - 0.1]).unwrap();
    /// assert!(stats.mean_direction < 1e-9 || TAU - stats.mean_direction < 1e-9);
    /// assert!(stats.resultant_length > 0.99);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(angles: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (count, sum_cos, sum_sin) = angles
            .into_iter()
            .filter(|a| !a.is_nan())
            .fold((0_usize, 0.0, 0.0), |(n, c, s), a| {
                (n + 1, c + a.cos(), s + a.sin())
            });
        if count == 0 {
            return None;
        }
        let n = count as f64;
        let (mean_cos, mean_sin) = (sum_cos / n, sum_sin / n);
        Some(Self {
            count,
            mean_direction: wrap_angle(mean_sin.atan2(mean_cos)),
            resultant_length: mean_cos.hypot(mean_sin).min(1.0),
        })
    }
}

/// Wraps an angle into `[0, 2π)`.
///
/// # Examples
///
/// ```
/// # use neuroseg_stats::circular::wrap_angle;
/// use std::f64::consts::PI;
///
/// assert_eq!(wrap_angle(0.0), 0.0);
/// assert!((wrap_angle(-PI / 2.0) - 1.5 * PI).abs() < 1e-12);
/// ```
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    #[test]
    fn test_empty_is_none() {
        assert!(CircularStats::new([f64::NAN]).is_none());
    }

    #[test]
    fn test_opposite_angles_cancel() {
        let stats = CircularStats::new([0.0, PI]).unwrap();
        assert!(stats.resultant_length < 1e-9);
    }

    #[test]
    fn test_concentrated_angles() {
        let stats = CircularStats::new([FRAC_PI_2 - 0.01, FRAC_PI_2, FRAC_PI_2 + 0.01]).unwrap();
        assert!((stats.mean_direction - FRAC_PI_2).abs() < 1e-9);
        assert!(stats.resultant_length > 0.999);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn test_wrap_angle_range() {
        for angle in [-10.0, -TAU, -1e-18, 0.0, 3.0, TAU, 100.0] {
            let wrapped = wrap_angle(angle);
            assert!((0.0..TAU).contains(&wrapped), "{angle} -> {wrapped}");
        }
    }
}

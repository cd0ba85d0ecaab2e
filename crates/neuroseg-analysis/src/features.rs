//! Neural feature matrix and behavioral kinematics
//!
//! [`FeatureSet::extract`] turns a [`Session`] into the inputs of the
//! segmentation stage:
//!
//! 1. **Rates**: spike counts divided by the bin width in seconds
//! 2. **Lag alignment**: neural row `i` is paired with kinematic row `i + lag`,
//!    so the neural signal leads behavior
//! 3. **Missing-row removal**: any aligned row with a missing count, position
//!    or velocity is dropped
//! 4. **Smoothing**: a Gaussian filter per channel along the retained rows
//!    ([`crate::smoothing`])
//!
//! The retained neural bin indices are kept so results can be traced back to
//! the recording.

use nalgebra::DMatrix;
use neuroseg_stats::circular::wrap_angle;
use serde::{Deserialize, Serialize};

use crate::{
    session::Session,
    smoothing::{EdgeMode, smooth_columns},
};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum FeatureError {
    #[display("lag of {lag_bins} bins leaves no samples in a {num_bins}-bin session")]
    LagTooLarge { lag_bins: usize, num_bins: usize },
    #[display("no samples remain after removing missing rows")]
    NoValidRows,
    #[display("{position} position samples but {velocity} velocity samples")]
    LengthMismatch { position: usize, velocity: usize },
}

/// Parameters of feature extraction, expressed in bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureParams {
    /// Number of bins by which the neural signal leads behavior
    pub lag_bins: usize,
    /// Gaussian smoothing width in bins; zero disables smoothing
    pub sigma_bins: f64,
    pub edge_mode: EdgeMode,
}

/// Behavioral quantities derived from finger position and velocity.
///
/// All series have one entry per retained sample. Angles are in radians in
/// `[0, 2π)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Velocity magnitude
    pub speed: Vec<f64>,
    /// Velocity heading
    pub direction: Vec<f64>,
    /// Distance from the mean position
    pub radial_position: Vec<f64>,
    /// Angle of the position around the mean position
    pub angular_position: Vec<f64>,
    /// Change in speed per second; zero for the first sample
    pub acceleration: Vec<f64>,
}

impl Kinematics {
    /// Derives kinematics from aligned position and velocity samples.
    ///
    /// Both series must have the same length.
    ///
    /// # Examples
    ///
    /// ```
    /// use neuroseg_analysis::features::Kinematics;
    ///
    /// let pos = [[1.0, 0.0], [-1.0, 0.0]];
    /// let vel = [[0.0, 2.0], [0.0, 4.0]];
    /// let kin = Kinematics::from_series(&pos, &vel, 100.0).unwrap();
    /// assert_eq!(kin.speed, vec![2.0, 4.0]);
    /// assert!((kin.direction[0] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    /// assert_eq!(kin.radial_position, vec![1.0, 1.0]);
    /// assert!((kin.acceleration[1] - 20.0).abs() < 1e-12);
    /// ```
    pub fn from_series(
        position: &[[f64; 2]],
        velocity: &[[f64; 2]],
        bin_width_ms: f64,
    ) -> Result<Self, FeatureError> {
        if position.len() != velocity.len() {
            return Err(FeatureError::LengthMismatch {
                position: position.len(),
                velocity: velocity.len(),
            });
        }
        let bin_s = bin_width_ms / 1000.0;
        let speed = velocity
            .iter()
            .map(|[vx, vy]| vx.hypot(*vy))
            .collect::<Vec<_>>();
        let direction = velocity
            .iter()
            .map(|[vx, vy]| wrap_angle(vy.atan2(*vx)))
            .collect();

        let center = mean_position(position);
        let radial_position = position
            .iter()
            .map(|[x, y]| (x - center[0]).hypot(y - center[1]))
            .collect();
        let angular_position = position
            .iter()
            .map(|[x, y]| wrap_angle((y - center[1]).atan2(x - center[0])))
            .collect();

        let acceleration = std::iter::once(0.0)
            .chain(speed.windows(2).map(|w| (w[1] - w[0]) / bin_s))
            .take(speed.len())
            .collect();

        Ok(Self {
            speed,
            direction,
            radial_position,
            angular_position,
            acceleration,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.speed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.speed.is_empty()
    }
}

#[expect(clippy::cast_precision_loss)]
fn mean_position(position: &[[f64; 2]]) -> [f64; 2] {
    if position.is_empty() {
        return [0.0, 0.0];
    }
    let n = position.len() as f64;
    let [sx, sy] = position
        .iter()
        .fold([0.0, 0.0], |[sx, sy], [x, y]| [sx + x, sy + y]);
    [sx / n, sy / n]
}

/// Lag-aligned, cleaned neural features with the matching behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    rates: DMatrix<f64>,
    position: Vec<[f64; 2]>,
    velocity: Vec<[f64; 2]>,
    kinematics: Kinematics,
    bin_indices: Vec<usize>,
    bin_width_ms: f64,
    dropped_rows: usize,
}

impl FeatureSet {
    /// Builds the feature set for `session`.
    pub fn extract(session: &Session, params: &FeatureParams) -> Result<Self, FeatureError> {
        let num_bins = session.num_bins();
        let lag = params.lag_bins;
        if lag >= num_bins {
            return Err(FeatureError::LagTooLarge {
                lag_bins: lag,
                num_bins,
            });
        }

        let bin_s = session.bin_width_ms() / 1000.0;
        let rates = session.spike_counts() / bin_s;

        let aligned = num_bins - lag;
        let bin_indices = (0..aligned)
            .filter(|&i| {
                rates.row(i).iter().all(|v| v.is_finite())
                    && session.finger_pos()[i + lag].iter().all(|v| v.is_finite())
                    && session.finger_vel()[i + lag].iter().all(|v| v.is_finite())
            })
            .collect::<Vec<_>>();
        if bin_indices.is_empty() {
            return Err(FeatureError::NoValidRows);
        }

        let dropped_rows = aligned - bin_indices.len();
        if dropped_rows > 0 {
            tracing::warn!(
                dropped_rows,
                retained = bin_indices.len(),
                "dropped rows with missing values"
            );
        }

        let rates = smooth_columns(
            &rates.select_rows(&bin_indices),
            params.sigma_bins,
            params.edge_mode,
        );
        let position = bin_indices
            .iter()
            .map(|&i| session.finger_pos()[i + lag])
            .collect::<Vec<_>>();
        let velocity = bin_indices
            .iter()
            .map(|&i| session.finger_vel()[i + lag])
            .collect::<Vec<_>>();
        let kinematics = Kinematics::from_series(&position, &velocity, session.bin_width_ms())?;

        tracing::info!(
            samples = bin_indices.len(),
            channels = rates.ncols(),
            lag_bins = lag,
            "extracted features"
        );

        Ok(Self {
            rates,
            position,
            velocity,
            kinematics,
            bin_indices,
            bin_width_ms: session.bin_width_ms(),
            dropped_rows,
        })
    }

    /// Smoothed firing rates (Hz), one row per retained sample.
    #[must_use]
    pub fn rates(&self) -> &DMatrix<f64> {
        &self.rates
    }

    #[must_use]
    pub fn position(&self) -> &[[f64; 2]] {
        &self.position
    }

    #[must_use]
    pub fn velocity(&self) -> &[[f64; 2]] {
        &self.velocity
    }

    #[must_use]
    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// Session bin index of the neural sample behind each retained row.
    #[must_use]
    pub fn bin_indices(&self) -> &[usize] {
        &self.bin_indices
    }

    #[must_use]
    pub fn bin_width_ms(&self) -> f64 {
        self.bin_width_ms
    }

    /// Number of aligned rows removed because of missing values.
    #[must_use]
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bin_indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bin_indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn params(lag_bins: usize) -> FeatureParams {
        FeatureParams {
            lag_bins,
            sigma_bins: 0.0,
            edge_mode: EdgeMode::Nearest,
        }
    }

    fn session(num_bins: usize) -> Session {
        let spikes = DMatrix::from_fn(num_bins, 3, |t, c| ((t * 7 + c) % 5) as f64);
        let pos = (0..num_bins).map(|t| [t as f64, -(t as f64)]).collect();
        let vel = (0..num_bins).map(|t| [1.0, t as f64]).collect();
        Session::new(10.0, vec![], spikes, pos, vel).unwrap()
    }

    #[test]
    fn test_lag_alignment_pairs_neural_row_with_later_behavior() {
        let session = session(20);
        for lag in [0, 1, 5, 19] {
            let features = FeatureSet::extract(&session, &params(lag)).unwrap();
            assert_eq!(features.len(), 20 - lag);
            assert_eq!(features.rates().nrows(), 20 - lag);
            for i in 0..features.len() {
                assert_eq!(features.position()[i], session.finger_pos()[i + lag]);
                assert_eq!(features.velocity()[i], session.finger_vel()[i + lag]);
                for c in 0..3 {
                    let expected = session.spike_counts()[(i, c)] / 0.01;
                    assert!((features.rates()[(i, c)] - expected).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_lag_must_leave_samples() {
        let session = session(4);
        assert_eq!(
            FeatureSet::extract(&session, &params(4)).unwrap_err(),
            FeatureError::LagTooLarge {
                lag_bins: 4,
                num_bins: 4
            }
        );
    }

    #[test]
    fn test_rows_with_missing_values_are_dropped() {
        let mut spikes = DMatrix::from_element(6, 2, 1.0);
        spikes[(1, 0)] = f64::NAN;
        let mut pos = vec![[0.0, 0.0]; 6];
        pos[4] = [f64::NAN, 0.0];
        let mut vel = vec![[1.0, 0.0]; 6];
        vel[5] = [0.0, f64::NAN];
        let session = Session::new(10.0, vec![], spikes, pos, vel).unwrap();

        let features = FeatureSet::extract(&session, &params(1)).unwrap();
        // Neural 1 is missing, behavior 4 (neural 3) and 5 (neural 4) are missing
        assert_eq!(features.bin_indices(), &[0, 2]);
        assert_eq!(features.dropped_rows(), 3);
        assert!(features.rates().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_single_missing_kinematic_row_drops_one_row() {
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        for _ in 0..50 {
            let num_bins = rng.random_range(2..40);
            let missing = rng.random_range(0..num_bins);
            let mut pos = vec![[1.0, 2.0]; num_bins];
            pos[missing][rng.random_range(0..2)] = f64::NAN;
            let session = Session::new(
                10.0,
                vec![],
                DMatrix::from_element(num_bins, 2, 3.0),
                pos,
                vec![[0.5, 0.5]; num_bins],
            )
            .unwrap();
            let features = FeatureSet::extract(&session, &params(0)).unwrap();
            assert_eq!(features.len(), num_bins - 1);
            assert!(!features.bin_indices().contains(&missing));
            assert!(features.rates().iter().all(|v| v.is_finite()));
            assert!(features.position().iter().flatten().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_all_missing_is_an_error() {
        let spikes = DMatrix::from_element(3, 1, f64::NAN);
        let session =
            Session::new(10.0, vec![], spikes, vec![[0.0; 2]; 3], vec![[0.0; 2]; 3]).unwrap();
        assert_eq!(
            FeatureSet::extract(&session, &params(0)).unwrap_err(),
            FeatureError::NoValidRows
        );
    }

    #[test]
    fn test_smoothing_keeps_constant_rates() {
        let spikes = DMatrix::from_element(30, 2, 2.0);
        let session =
            Session::new(20.0, vec![], spikes, vec![[0.0; 2]; 30], vec![[0.0; 2]; 30]).unwrap();
        let params = FeatureParams {
            lag_bins: 5,
            sigma_bins: 1.25,
            edge_mode: EdgeMode::Reflect,
        };
        let features = FeatureSet::extract(&session, &params).unwrap();
        assert!(features.rates().iter().all(|v| (v - 100.0).abs() < 1e-9));
    }

    #[test]
    fn test_direction_convention() {
        let vel = [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
        let kin = Kinematics::from_series(&[[0.0; 2]; 4], &vel, 10.0).unwrap();
        let expected = [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2];
        for (actual, expected) in kin.direction.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-12);
        }
        assert!(kin.direction.iter().all(|d| (0.0..TAU).contains(d)));
    }

    #[test]
    fn test_random_velocities_have_wrapped_direction_and_zero_initial_acceleration() {
        let mut rng = Pcg64Mcg::seed_from_u64(8);
        for _ in 0..50 {
            let n = rng.random_range(1..30);
            let vel = (0..n)
                .map(|_| [rng.random_range(-5.0..5.0), rng.random_range(-5.0..5.0)])
                .collect::<Vec<_>>();
            let kin = Kinematics::from_series(&vec![[0.0; 2]; n], &vel, 20.0).unwrap();
            assert!(kin.direction.iter().all(|d| (0.0..TAU).contains(d)));
            assert_eq!(kin.acceleration[0], 0.0);
            assert_eq!(kin.acceleration.len(), n);
        }
    }

    #[test]
    fn test_mismatched_series_are_rejected() {
        let pos = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let vel = [[1.0, 0.0], [1.0, 0.0]];
        assert_eq!(
            Kinematics::from_series(&pos, &vel, 10.0).unwrap_err(),
            FeatureError::LengthMismatch {
                position: 3,
                velocity: 2
            }
        );
        assert!(Kinematics::from_series(&[], &[], 10.0).unwrap().is_empty());
    }

    #[test]
    fn test_positions_are_centered() {
        let pos = [[2.0, 2.0], [4.0, 2.0], [3.0, 3.0], [3.0, 1.0]];
        let kin = Kinematics::from_series(&pos, &[[0.0; 2]; 4], 10.0).unwrap();
        assert!(kin.radial_position.iter().all(|r| (r - 1.0).abs() < 1e-12));
        assert!((kin.angular_position[0] - PI).abs() < 1e-12);
        assert!((kin.angular_position[2] - FRAC_PI_2).abs() < 1e-12);
        assert!(kin.acceleration.iter().all(|a| *a == 0.0));
    }
}

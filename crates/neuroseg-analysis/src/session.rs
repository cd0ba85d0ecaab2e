//! Recording session data structures
//!
//! A session is a time-ordered table of binned spike counts (one column per
//! recording channel) and finger kinematics (position and velocity), all
//! sharing the same bin width.
//!
//! # Serialization
//!
//! [`SessionFile`] is the on-disk JSON layout. Missing samples are `null`:
//!
//! ```json
//! {
//!   "bin_width_ms": 5.0,
//!   "channel_names": ["ch0", "ch1"],
//!   "spike_counts": [[0, 1], [2, null]],
//!   "finger_pos": [[0.0, 1.0], [null, null]],
//!   "finger_vel": [[0.5, 0.0], [0.4, 0.1]]
//! }
//! ```
//!
//! [`Session`] is the validated in-memory form; missing values become NaN.
//!
//! # Examples
//!
//! ```
//! use neuroseg_analysis::session::{Session, SessionFile};
//!
//! let file = SessionFile {
//!     bin_width_ms: 5.0,
//!     channel_names: vec![],
//!     spike_counts: vec![vec![Some(1.0)], vec![Some(0.0)], vec![Some(2.0)], vec![Some(1.0)]],
//!     finger_pos: vec![[Some(0.0), Some(0.0)]; 4],
//!     finger_vel: vec![[Some(1.0), None]; 4],
//! };
//! let session = Session::try_from(file).unwrap();
//! assert_eq!(session.num_bins(), 4);
//!
//! // Resample to 10 ms bins: counts are summed pairwise
//! let rebinned = session.rebin(10.0).unwrap();
//! assert_eq!(rebinned.num_bins(), 2);
//! assert_eq!(rebinned.spike_counts()[(0, 0)], 1.0);
//! assert_eq!(rebinned.spike_counts()[(1, 0)], 3.0);
//! ```

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Errors raised while validating or resampling a session.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SessionError {
    #[display("bin width must be positive, got {bin_width_ms} ms")]
    NonPositiveBinWidth { bin_width_ms: f64 },
    #[display("session has no recording channels")]
    NoChannels,
    #[display("spike row {row} has {actual} channels, expected {expected}")]
    RaggedSpikeRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("{spikes} spike rows, {positions} position rows and {velocities} velocity rows")]
    LengthMismatch {
        spikes: usize,
        positions: usize,
        velocities: usize,
    },
    #[display("{names} channel names for {channels} channels")]
    ChannelNameMismatch { names: usize, channels: usize },
    #[display("target bin width {target_ms} ms is not a multiple of {native_ms} ms")]
    IncompatibleBinWidth { native_ms: f64, target_ms: f64 },
    #[display("maximum duration must be positive, got {max_duration_s} s")]
    NonPositiveDuration { max_duration_s: f64 },
}

/// On-disk layout of a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    /// Width of each time bin in milliseconds
    pub bin_width_ms: f64,
    /// Optional channel labels, one per spike column
    #[serde(default)]
    pub channel_names: Vec<String>,
    /// Spike counts per bin (rows) and channel (columns)
    pub spike_counts: Vec<Vec<Option<f64>>>,
    /// Finger position `[x, y]` per bin
    pub finger_pos: Vec<[Option<f64>; 2]>,
    /// Finger velocity `[x, y]` per bin
    pub finger_vel: Vec<[Option<f64>; 2]>,
}

/// A validated recording session.
///
/// All series share one time index: row `t` of the spike matrix, the position
/// and the velocity describe the same bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    bin_width_ms: f64,
    channel_names: Vec<String>,
    spike_counts: DMatrix<f64>,
    finger_pos: Vec<[f64; 2]>,
    finger_vel: Vec<[f64; 2]>,
}

impl Session {
    /// Creates a session from in-memory series. Missing values are NaN.
    pub fn new(
        bin_width_ms: f64,
        channel_names: Vec<String>,
        spike_counts: DMatrix<f64>,
        finger_pos: Vec<[f64; 2]>,
        finger_vel: Vec<[f64; 2]>,
    ) -> Result<Self, SessionError> {
        if !(bin_width_ms.is_finite() && bin_width_ms > 0.0) {
            return Err(SessionError::NonPositiveBinWidth { bin_width_ms });
        }
        if spike_counts.ncols() == 0 {
            return Err(SessionError::NoChannels);
        }
        if spike_counts.nrows() != finger_pos.len() || spike_counts.nrows() != finger_vel.len() {
            return Err(SessionError::LengthMismatch {
                spikes: spike_counts.nrows(),
                positions: finger_pos.len(),
                velocities: finger_vel.len(),
            });
        }
        if !channel_names.is_empty() && channel_names.len() != spike_counts.ncols() {
            return Err(SessionError::ChannelNameMismatch {
                names: channel_names.len(),
                channels: spike_counts.ncols(),
            });
        }
        Ok(Self {
            bin_width_ms,
            channel_names,
            spike_counts,
            finger_pos,
            finger_vel,
        })
    }

    #[must_use]
    pub fn bin_width_ms(&self) -> f64 {
        self.bin_width_ms
    }

    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.spike_counts.nrows()
    }

    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.spike_counts.ncols()
    }

    /// Recording duration covered by the bins, in seconds.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn duration_s(&self) -> f64 {
        self.num_bins() as f64 * self.bin_width_ms / 1000.0
    }

    #[must_use]
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Spike counts, one row per bin and one column per channel.
    #[must_use]
    pub fn spike_counts(&self) -> &DMatrix<f64> {
        &self.spike_counts
    }

    #[must_use]
    pub fn finger_pos(&self) -> &[[f64; 2]] {
        &self.finger_pos
    }

    #[must_use]
    pub fn finger_vel(&self) -> &[[f64; 2]] {
        &self.finger_vel
    }

    /// Resamples the session to a coarser bin width.
    ///
    /// `target_ms` must be an integer multiple of the current bin width. Spike
    /// counts are summed over each window (a missing count makes the window
    /// missing); kinematics are averaged over the non-missing samples of each
    /// window. A trailing partial window is dropped.
    pub fn rebin(&self, target_ms: f64) -> Result<Self, SessionError> {
        let ratio = target_ms / self.bin_width_ms;
        let rounded = ratio.round();
        if !ratio.is_finite() || rounded < 1.0 || (ratio - rounded).abs() > 1e-6 {
            return Err(SessionError::IncompatibleBinWidth {
                native_ms: self.bin_width_ms,
                target_ms,
            });
        }
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let factor = rounded as usize;
        if factor == 1 {
            return Ok(self.clone());
        }

        let num_bins = self.num_bins() / factor;
        let spike_counts = DMatrix::from_fn(num_bins, self.num_channels(), |t, c| {
            self.spike_counts
                .view((t * factor, c), (factor, 1))
                .iter()
                .sum()
        });
        let finger_pos = (0..num_bins)
            .map(|t| mean_ignoring_missing(&self.finger_pos[t * factor..(t + 1) * factor]))
            .collect();
        let finger_vel = (0..num_bins)
            .map(|t| mean_ignoring_missing(&self.finger_vel[t * factor..(t + 1) * factor]))
            .collect();

        Ok(Self {
            bin_width_ms: self.bin_width_ms * rounded,
            channel_names: self.channel_names.clone(),
            spike_counts,
            finger_pos,
            finger_vel,
        })
    }

    /// Keeps only the bins inside the first `max_duration_s` seconds.
    pub fn truncate(&self, max_duration_s: f64) -> Result<Self, SessionError> {
        if max_duration_s.is_nan() || max_duration_s <= 0.0 {
            return Err(SessionError::NonPositiveDuration { max_duration_s });
        }
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let limit = (max_duration_s * 1000.0 / self.bin_width_ms).floor() as usize;
        let num_bins = limit.min(self.num_bins());
        Ok(Self {
            bin_width_ms: self.bin_width_ms,
            channel_names: self.channel_names.clone(),
            spike_counts: self.spike_counts.rows(0, num_bins).into_owned(),
            finger_pos: self.finger_pos[..num_bins].to_vec(),
            finger_vel: self.finger_vel[..num_bins].to_vec(),
        })
    }
}

/// Component-wise mean over the samples where the component is present.
#[expect(clippy::cast_precision_loss)]
fn mean_ignoring_missing(samples: &[[f64; 2]]) -> [f64; 2] {
    std::array::from_fn(|axis| {
        let (sum, count) = samples
            .iter()
            .map(|s| s[axis])
            .filter(|v| !v.is_nan())
            .fold((0.0, 0_usize), |(sum, n), v| (sum + v, n + 1));
        if count == 0 { f64::NAN } else { sum / count as f64 }
    })
}

impl TryFrom<SessionFile> for Session {
    type Error = SessionError;

    fn try_from(file: SessionFile) -> Result<Self, Self::Error> {
        let num_bins = file.spike_counts.len();
        let num_channels = file.spike_counts.first().map_or(0, Vec::len);
        if let Some((row, values)) = file
            .spike_counts
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != num_channels)
        {
            return Err(SessionError::RaggedSpikeRow {
                row,
                expected: num_channels,
                actual: values.len(),
            });
        }
        let spike_counts = DMatrix::from_fn(num_bins, num_channels, |t, c| {
            file.spike_counts[t][c].unwrap_or(f64::NAN)
        });
        let present = |xy: [Option<f64>; 2]| xy.map(|v| v.unwrap_or(f64::NAN));
        Session::new(
            file.bin_width_ms,
            file.channel_names,
            spike_counts,
            file.finger_pos.into_iter().map(present).collect(),
            file.finger_vel.into_iter().map(present).collect(),
        )
    }
}

impl From<&Session> for SessionFile {
    fn from(session: &Session) -> Self {
        let known = |v: f64| (!v.is_nan()).then_some(v);
        Self {
            bin_width_ms: session.bin_width_ms,
            channel_names: session.channel_names.clone(),
            spike_counts: session
                .spike_counts
                .row_iter()
                .map(|row| row.iter().copied().map(known).collect())
                .collect(),
            finger_pos: session.finger_pos.iter().map(|xy| xy.map(known)).collect(),
            finger_vel: session.finger_vel.iter().map(|xy| xy.map(known)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_session(num_bins: usize) -> Session {
        let spikes = DMatrix::from_fn(num_bins, 2, |t, c| (t + c) as f64);
        let pos = (0..num_bins).map(|t| [t as f64, 0.0]).collect();
        let vel = (0..num_bins).map(|t| [1.0, t as f64]).collect();
        Session::new(5.0, vec![], spikes, pos, vel).unwrap()
    }

    #[test]
    fn test_rejects_invalid_sessions() {
        let spikes = DMatrix::zeros(3, 1);
        assert_eq!(
            Session::new(0.0, vec![], spikes.clone(), vec![[0.0; 2]; 3], vec![[0.0; 2]; 3])
                .unwrap_err(),
            SessionError::NonPositiveBinWidth { bin_width_ms: 0.0 }
        );
        assert_eq!(
            Session::new(5.0, vec![], spikes.clone(), vec![[0.0; 2]; 2], vec![[0.0; 2]; 3])
                .unwrap_err(),
            SessionError::LengthMismatch {
                spikes: 3,
                positions: 2,
                velocities: 3
            }
        );
        assert_eq!(
            Session::new(
                5.0,
                vec!["a".into(), "b".into()],
                spikes,
                vec![[0.0; 2]; 3],
                vec![[0.0; 2]; 3]
            )
            .unwrap_err(),
            SessionError::ChannelNameMismatch {
                names: 2,
                channels: 1
            }
        );
        assert_eq!(
            Session::new(5.0, vec![], DMatrix::zeros(3, 0), vec![[0.0; 2]; 3], vec![[0.0; 2]; 3])
                .unwrap_err(),
            SessionError::NoChannels
        );
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let file = SessionFile {
            bin_width_ms: 5.0,
            channel_names: vec![],
            spike_counts: vec![vec![Some(1.0), Some(2.0)], vec![Some(1.0)]],
            finger_pos: vec![[Some(0.0); 2]; 2],
            finger_vel: vec![[Some(0.0); 2]; 2],
        };
        assert_eq!(
            Session::try_from(file).unwrap_err(),
            SessionError::RaggedSpikeRow {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_missing_values_become_nan_and_back() {
        let json = r#"{
            "bin_width_ms": 10.0,
            "spike_counts": [[1, null], [0, 3]],
            "finger_pos": [[0.0, 1.0], [null, 2.0]],
            "finger_vel": [[0.0, 0.0], [1.0, 1.0]]
        }"#;
        let file: SessionFile = serde_json::from_str(json).unwrap();
        let session = Session::try_from(file.clone()).unwrap();
        assert!(session.spike_counts()[(0, 1)].is_nan());
        assert!(session.finger_pos()[1][0].is_nan());
        assert_eq!(SessionFile::from(&session), file);
    }

    #[test]
    fn test_rebin_sums_counts_and_averages_kinematics() {
        let session = ramp_session(7);
        let rebinned = session.rebin(15.0).unwrap();
        assert_eq!(rebinned.num_bins(), 2);
        assert!((rebinned.bin_width_ms() - 15.0).abs() < 1e-12);
        // Channel 0 counts are 0,1,2 | 3,4,5
        assert!((rebinned.spike_counts()[(0, 0)] - 3.0).abs() < 1e-12);
        assert!((rebinned.spike_counts()[(1, 0)] - 12.0).abs() < 1e-12);
        assert!((rebinned.finger_pos()[1][0] - 4.0).abs() < 1e-12);
        assert!((rebinned.finger_vel()[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rebin_skips_missing_kinematics() {
        let spikes = DMatrix::from_element(2, 1, 1.0);
        let pos = vec![[f64::NAN, 1.0], [3.0, f64::NAN]];
        let vel = vec![[f64::NAN; 2], [f64::NAN; 2]];
        let session = Session::new(1.0, vec![], spikes, pos, vel).unwrap();
        let rebinned = session.rebin(2.0).unwrap();
        assert_eq!(rebinned.finger_pos()[0], [3.0, 1.0]);
        assert!(rebinned.finger_vel()[0].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rebin_requires_integer_multiple() {
        let session = ramp_session(4);
        assert!(matches!(
            session.rebin(7.5),
            Err(SessionError::IncompatibleBinWidth { .. })
        ));
        assert!(matches!(
            session.rebin(2.5),
            Err(SessionError::IncompatibleBinWidth { .. })
        ));
        assert_eq!(session.rebin(5.0).unwrap(), session);
    }

    #[test]
    fn test_truncate() {
        let session = ramp_session(100);
        // 5 ms bins: 0.2 s keeps 40 bins
        let truncated = session.truncate(0.2).unwrap();
        assert_eq!(truncated.num_bins(), 40);
        assert_eq!(truncated.finger_pos()[39], [39.0, 0.0]);
        // Longer than the recording keeps everything
        assert_eq!(session.truncate(60.0).unwrap().num_bins(), 100);
        assert!(session.truncate(0.0).is_err());
    }
}

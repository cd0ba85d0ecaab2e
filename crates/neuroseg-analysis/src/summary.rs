//! Per-state behavioral summaries and state transition counts

use neuroseg_stats::{circular::CircularStats, descriptive::DescriptiveStats};
use serde::{Deserialize, Serialize};

use crate::{
    features::Kinematics,
    projection::{ProjectionError, StateColor, partition_by_state, state_color},
    segment::{Segment, StateSequence},
};

/// How one state relates to behavior.
///
/// Statistics are `None` for a state that was never visited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub state: usize,
    pub color: StateColor,
    /// Number of samples assigned to the state
    pub samples: usize,
    /// Fraction of all samples assigned to the state
    pub occupancy: f64,
    /// Number of segments with this label
    pub segments: usize,
    pub mean_segment_ms: Option<f64>,
    pub speed: Option<DescriptiveStats>,
    pub radial_position: Option<DescriptiveStats>,
    pub acceleration: Option<DescriptiveStats>,
    pub direction: Option<CircularStats>,
    pub angular_position: Option<CircularStats>,
}

/// Summarizes every state of `seq` against the aligned `kinematics`.
#[expect(clippy::cast_precision_loss)]
pub fn summarize_states(
    kinematics: &Kinematics,
    seq: &StateSequence,
    bin_width_ms: f64,
) -> Result<Vec<StateSummary>, ProjectionError> {
    let speed = partition_by_state(&kinematics.speed, seq)?;
    let radial = partition_by_state(&kinematics.radial_position, seq)?;
    let acceleration = partition_by_state(&kinematics.acceleration, seq)?;
    let direction = partition_by_state(&kinematics.direction, seq)?;
    let angular = partition_by_state(&kinematics.angular_position, seq)?;

    let segments = seq.segments();
    let total = seq.len();
    let summaries = (0..seq.n_states())
        .map(|state| {
            let own = segments.iter().filter(|s| s.label == state).collect::<Vec<_>>();
            let samples = speed[state].len();
            let mean_segment_ms = (!own.is_empty()).then(|| {
                own.iter().map(|s| s.len()).sum::<usize>() as f64 / own.len() as f64 * bin_width_ms
            });
            StateSummary {
                state,
                color: state_color(state, seq.n_states()),
                samples,
                occupancy: if total == 0 {
                    0.0
                } else {
                    samples as f64 / total as f64
                },
                segments: own.len(),
                mean_segment_ms,
                speed: DescriptiveStats::new(speed[state].iter().copied()),
                radial_position: DescriptiveStats::new(radial[state].iter().copied()),
                acceleration: DescriptiveStats::new(acceleration[state].iter().copied()),
                direction: CircularStats::new(direction[state].iter().copied()),
                angular_position: CircularStats::new(angular[state].iter().copied()),
            }
        })
        .collect();
    Ok(summaries)
}

/// Counts of segment-to-segment transitions; `counts[i][j]` is the number of
/// times a state-`i` segment is followed by a state-`j` segment.
///
/// The diagonal is always zero because consecutive segments differ.
///
/// # Examples
///
/// ```
/// use neuroseg_analysis::{segment::StateSequence, summary::TransitionCounts};
///
/// let seq = StateSequence::new(vec![0, 0, 1, 0, 2], 3).unwrap();
/// let transitions = TransitionCounts::from_segments(&seq.segments(), 3);
/// assert_eq!(transitions.counts, vec![vec![0, 1, 1], vec![1, 0, 0], vec![0, 0, 0]]);
/// assert_eq!(transitions.total(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub counts: Vec<Vec<u64>>,
}

impl TransitionCounts {
    #[must_use]
    pub fn from_segments(segments: &[Segment], n_states: usize) -> Self {
        let mut counts = vec![vec![0; n_states]; n_states];
        for pair in segments.windows(2) {
            counts[pair[0].label][pair[1].label] += 1;
        }
        Self { counts }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

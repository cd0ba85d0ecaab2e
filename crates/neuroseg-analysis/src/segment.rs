//! Decoded state sequences and their contiguous segments
//!
//! A [`StateSequence`] assigns one of `n_states` labels to every retained
//! sample. [`StateSequence::segments`] splits it into maximal runs of equal
//! labels.
//!
//! # Examples
//!
//! ```
//! use neuroseg_analysis::segment::{Segment, StateSequence};
//!
//! let seq = StateSequence::new(vec![0, 0, 1, 1, 1, 0], 2).unwrap();
//! assert_eq!(
//!     seq.segments(),
//!     vec![
//!         Segment { start: 0, end: 2, label: 0 },
//!         Segment { start: 2, end: 5, label: 1 },
//!         Segment { start: 5, end: 6, label: 0 },
//!     ]
//! );
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SegmentError {
    #[display("state count must be positive")]
    NoStates,
    #[display("label {label} at index {index} is not below the state count {n_states}")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        n_states: usize,
    },
}

/// A maximal run of identical labels over `start..end` (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub label: usize,
}

impl Segment {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Per-sample state labels, each in `0..n_states`.
///
/// Deserialization goes through [`StateSequence::new`], so a stored sequence
/// with an out-of-range label is rejected on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredStateSequence")]
pub struct StateSequence {
    labels: Vec<usize>,
    n_states: usize,
}

#[derive(Deserialize)]
struct StoredStateSequence {
    labels: Vec<usize>,
    n_states: usize,
}

impl TryFrom<StoredStateSequence> for StateSequence {
    type Error = SegmentError;

    fn try_from(stored: StoredStateSequence) -> Result<Self, Self::Error> {
        Self::new(stored.labels, stored.n_states)
    }
}

impl StateSequence {
    pub fn new(labels: Vec<usize>, n_states: usize) -> Result<Self, SegmentError> {
        if n_states == 0 {
            return Err(SegmentError::NoStates);
        }
        if let Some((index, &label)) = labels.iter().enumerate().find(|(_, l)| **l >= n_states) {
            return Err(SegmentError::LabelOutOfRange {
                index,
                label,
                n_states,
            });
        }
        Ok(Self { labels, n_states })
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[must_use]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Splits the sequence into maximal runs of equal labels.
    ///
    /// Segments are ordered, non-overlapping and cover `0..len()` exactly.
    /// Consecutive segments have different labels. An empty sequence has no
    /// segments.
    #[must_use]
    pub fn segments(&self) -> Vec<Segment> {
        self.labels
            .chunk_by(|a, b| a == b)
            .scan(0, |start, run| {
                let segment = Segment {
                    start: *start,
                    end: *start + run.len(),
                    label: run[0],
                };
                *start = segment.end;
                Some(segment)
            })
            .collect()
    }

    /// Number of samples assigned to each state.
    #[must_use]
    pub fn occupancy(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_states];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn test_deserialize_validates_labels() {
        let err = serde_json::from_str::<StateSequence>(r#"{"labels":[0,5,1],"n_states":2}"#)
            .unwrap_err();
        assert!(err.to_string().contains("label 5 at index 1"), "{err}");
        assert!(serde_json::from_str::<StateSequence>(r#"{"labels":[],"n_states":0}"#).is_err());

        let seq = StateSequence::new(vec![1, 0, 1], 2).unwrap();
        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(serde_json::from_str::<StateSequence>(&json).unwrap(), seq);
    }

    #[test]
    fn test_empty_sequence_has_no_segments() {
        let seq = StateSequence::new(vec![], 3).unwrap();
        assert!(seq.segments().is_empty());
        assert_eq!(seq.occupancy(), vec![0, 0, 0]);
    }

    #[test]
    fn test_single_label_is_one_segment() {
        let seq = StateSequence::new(vec![2; 7], 3).unwrap();
        assert_eq!(
            seq.segments(),
            vec![Segment {
                start: 0,
                end: 7,
                label: 2
            }]
        );
    }

    #[test]
    fn test_alternating_labels() {
        let seq = StateSequence::new(vec![0, 1, 0, 1], 2).unwrap();
        let segments = seq.segments();
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn test_rejects_out_of_range_labels() {
        assert_eq!(
            StateSequence::new(vec![0, 3, 1], 3).unwrap_err(),
            SegmentError::LabelOutOfRange {
                index: 1,
                label: 3,
                n_states: 3
            }
        );
        assert_eq!(StateSequence::new(vec![], 0).unwrap_err(), SegmentError::NoStates);
    }

    #[test]
    fn test_segments_partition_random_sequences() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        for _ in 0..200 {
            let n_states = rng.random_range(1..5);
            let len = rng.random_range(0..60);
            // Sticky labels produce a mix of short and long runs
            let mut labels = Vec::with_capacity(len);
            for _ in 0..len {
                let keep = labels.last().is_some() && rng.random_bool(0.7);
                let label = if keep {
                    *labels.last().unwrap()
                } else {
                    rng.random_range(0..n_states)
                };
                labels.push(label);
            }
            let seq = StateSequence::new(labels.clone(), n_states).unwrap();
            let segments = seq.segments();

            let mut cursor = 0;
            for (i, segment) in segments.iter().enumerate() {
                assert_eq!(segment.start, cursor);
                assert!(!segment.is_empty());
                assert!(labels[segment.range()].iter().all(|l| *l == segment.label));
                if i > 0 {
                    assert_ne!(segments[i - 1].label, segment.label);
                }
                cursor = segment.end;
            }
            assert_eq!(cursor, len);
            assert_eq!(
                seq.occupancy().iter().sum::<usize>(),
                segments.iter().map(Segment::len).sum::<usize>()
            );
        }
    }
}

//! Projection of decoded states onto behavioral features
//!
//! Every helper pairs a per-sample behavioral [`Feature`] with a
//! [`StateSequence`] of the same length:
//!
//! - [`time_series_overlay`] and [`trajectory_overlay`] cut a feature into
//!   per-segment traces colored by state
//! - [`partition_by_state`] groups samples by label
//! - [`state_histograms`] and [`state_angular_histograms`] bin each state's
//!   values on shared edges, so panels are directly comparable
//!
//! State colors come from a fixed colormap indexed by `label / n_states`
//! ([`state_color`]), so a state keeps its color across every view.

use neuroseg_stats::histogram::{BinEdges, Histogram};
use serde::{Deserialize, Serialize};

use crate::segment::{Segment, StateSequence};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ProjectionError {
    #[display("feature has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[display("feature has {feature} samples but the state sequence has {states}")]
    LengthMismatch { feature: usize, states: usize },
    #[display("bin count must be positive")]
    NoBins,
    #[display("feature has no finite values")]
    NoFiniteValues,
}

/// A per-sample behavioral feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// One value per sample, such as speed
    Scalar(Vec<f64>),
    /// One `[x, y]` point per sample, such as finger position
    Planar(Vec<[f64; 2]>),
}

impl Feature {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Feature::Scalar(values) => values.len(),
            Feature::Planar(points) => points.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of components per sample.
    #[must_use]
    pub fn dimension(&self) -> usize {
        match self {
            Feature::Scalar(_) => 1,
            Feature::Planar(_) => 2,
        }
    }

    fn scalar(&self) -> Result<&[f64], ProjectionError> {
        match self {
            Feature::Scalar(values) => Ok(values),
            Feature::Planar(_) => Err(ProjectionError::DimensionMismatch {
                expected: 1,
                actual: 2,
            }),
        }
    }

    fn planar(&self) -> Result<&[[f64; 2]], ProjectionError> {
        match self {
            Feature::Planar(points) => Ok(points),
            Feature::Scalar(_) => Err(ProjectionError::DimensionMismatch {
                expected: 2,
                actual: 1,
            }),
        }
    }
}

/// Display color of a state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateColor {
    /// Colormap position, `label / n_states`
    pub position: f64,
    pub rgb: [u8; 3],
}

impl StateColor {
    /// `#rrggbb` notation.
    #[must_use]
    pub fn hex(&self) -> String {
        let [r, g, b] = self.rgb;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// Color of state `label` out of `n_states`.
///
/// Positions run from blue (state 0) through green and yellow towards red.
///
/// # Examples
///
/// ```
/// use neuroseg_analysis::projection::state_color;
///
/// let first = state_color(0, 4);
/// assert_eq!(first.position, 0.0);
/// assert_eq!(first.hex(), "#000080");
/// assert_eq!(state_color(2, 4).position, 0.5);
/// ```
#[must_use]
pub fn state_color(label: usize, n_states: usize) -> StateColor {
    #[expect(clippy::cast_precision_loss)]
    let position = if n_states == 0 {
        0.0
    } else {
        label as f64 / n_states as f64
    };
    let channel = |offset: f64| unit_to_byte(1.5 - (4.0 * position - offset).abs());
    StateColor {
        position,
        rgb: [channel(3.0), channel(2.0), channel(1.0)],
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_byte(level: f64) -> u8 {
    (level.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// One segment of a feature, drawn in its state's color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTrace {
    pub segment: Segment,
    pub color: StateColor,
    /// `(time_s, value)` for time series, `(x, y)` for trajectories
    pub points: Vec<[f64; 2]>,
}

fn check_length(feature: &Feature, seq: &StateSequence) -> Result<(), ProjectionError> {
    if feature.len() == seq.len() {
        Ok(())
    } else {
        Err(ProjectionError::LengthMismatch {
            feature: feature.len(),
            states: seq.len(),
        })
    }
}

fn traces<F>(seq: &StateSequence, mut point: F) -> Vec<SegmentTrace>
where
    F: FnMut(usize) -> [f64; 2],
{
    seq.segments()
        .into_iter()
        .map(|segment| SegmentTrace {
            color: state_color(segment.label, seq.n_states()),
            points: segment.range().map(&mut point).collect(),
            segment,
        })
        .collect()
}

/// Cuts a scalar feature into per-segment `(time_s, value)` traces.
///
/// Sample `i` is placed at `i * bin_width_ms / 1000` seconds.
pub fn time_series_overlay(
    feature: &Feature,
    seq: &StateSequence,
    bin_width_ms: f64,
) -> Result<Vec<SegmentTrace>, ProjectionError> {
    let values = feature.scalar()?;
    check_length(feature, seq)?;
    #[expect(clippy::cast_precision_loss)]
    let traces = traces(seq, |i| [i as f64 * bin_width_ms / 1000.0, values[i]]);
    Ok(traces)
}

/// Cuts a planar feature into per-segment `(x, y)` paths.
pub fn trajectory_overlay(
    feature: &Feature,
    seq: &StateSequence,
) -> Result<Vec<SegmentTrace>, ProjectionError> {
    let points = feature.planar()?;
    check_length(feature, seq)?;
    Ok(traces(seq, |i| points[i]))
}

/// Groups `values` by state label; entry `k` holds state `k`'s values in
/// sample order.
///
/// # Examples
///
/// ```
/// use neuroseg_analysis::{projection::partition_by_state, segment::StateSequence};
///
/// let seq = StateSequence::new(vec![1, 0, 1, 2], 3).unwrap();
/// let groups = partition_by_state(&[10, 20, 30, 40], &seq).unwrap();
/// assert_eq!(groups, vec![vec![20], vec![10, 30], vec![40]]);
/// ```
pub fn partition_by_state<T>(
    values: &[T],
    seq: &StateSequence,
) -> Result<Vec<Vec<T>>, ProjectionError>
where
    T: Clone,
{
    if values.len() != seq.len() {
        return Err(ProjectionError::LengthMismatch {
            feature: values.len(),
            states: seq.len(),
        });
    }
    let mut groups = vec![Vec::new(); seq.n_states()];
    for (value, &label) in values.iter().zip(seq.labels()) {
        groups[label].push(value.clone());
    }
    Ok(groups)
}

/// Per-state histograms of one feature on shared bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHistograms {
    pub feature: String,
    /// Whether the edges span `[0, 2π)` and the panels are polar
    pub angular: bool,
    pub edges: BinEdges,
    /// One histogram per state; unused states have all-zero counts
    pub histograms: Vec<Histogram>,
}

/// Histograms of a scalar feature per state.
///
/// The edges split the global finite range of the feature into `n_bins`
/// equal bins and are shared by all states. A constant feature gets a unit
/// width range centered on its value.
pub fn state_histograms(
    name: &str,
    feature: &Feature,
    seq: &StateSequence,
    n_bins: usize,
) -> Result<StateHistograms, ProjectionError> {
    let values = feature.scalar()?;
    check_length(feature, seq)?;
    if n_bins == 0 {
        return Err(ProjectionError::NoBins);
    }
    let edges = BinEdges::spanning(values.iter().copied(), n_bins)
        .ok_or(ProjectionError::NoFiniteValues)?;
    let histograms = partition_by_state(values, seq)?
        .into_iter()
        .map(|group| Histogram::with_edges(&edges, group))
        .collect();
    Ok(StateHistograms {
        feature: name.to_owned(),
        angular: false,
        edges,
        histograms,
    })
}

/// Polar histograms of an angular feature per state, with `n_wedges` equal
/// wedges over `[0, 2π)`.
pub fn state_angular_histograms(
    name: &str,
    feature: &Feature,
    seq: &StateSequence,
    n_wedges: usize,
) -> Result<StateHistograms, ProjectionError> {
    let values = feature.scalar()?;
    check_length(feature, seq)?;
    let edges = BinEdges::angular(n_wedges).ok_or(ProjectionError::NoBins)?;
    let histograms = partition_by_state(values, seq)?
        .into_iter()
        .map(|group| Histogram::angular(group, n_wedges))
        .collect();
    Ok(StateHistograms {
        feature: name.to_owned(),
        angular: true,
        edges,
        histograms,
    })
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn seq(labels: &[usize], n_states: usize) -> StateSequence {
        StateSequence::new(labels.to_vec(), n_states).unwrap()
    }

    #[test]
    fn test_colors_are_distinct_and_stable() {
        let colors = (0..6).map(|k| state_color(k, 6)).collect::<Vec<_>>();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a.rgb, b.rgb);
            }
        }
        assert_eq!(state_color(3, 6), colors[3]);
        assert!(colors.windows(2).all(|w| w[0].position < w[1].position));
    }

    #[test]
    fn test_time_series_overlay_follows_segments() {
        let feature = Feature::Scalar(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let seq = seq(&[0, 0, 1, 1, 0], 2);
        let traces = time_series_overlay(&feature, &seq, 100.0).unwrap();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[1].points, vec![[0.2, 3.0], [0.3, 4.0]]);
        assert_eq!(traces[0].color, traces[2].color);
        assert_ne!(traces[0].color, traces[1].color);
        let total = traces.iter().map(|t| t.points.len()).sum::<usize>();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_trajectory_overlay() {
        let feature = Feature::Planar(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]);
        let traces = trajectory_overlay(&feature, &seq(&[2, 1, 1], 3)).unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].segment.label, 2);
        assert_eq!(traces[1].points, vec![[1.0, 1.0], [2.0, 0.0]]);
    }

    #[test]
    fn test_dimension_and_length_mismatch() {
        let planar = Feature::Planar(vec![[0.0, 0.0]; 2]);
        let scalar = Feature::Scalar(vec![0.0; 2]);
        let seq2 = seq(&[0, 0], 1);
        assert_eq!(
            time_series_overlay(&planar, &seq2, 10.0).unwrap_err(),
            ProjectionError::DimensionMismatch {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(
            trajectory_overlay(&scalar, &seq2).unwrap_err(),
            ProjectionError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(
            state_histograms("x", &scalar, &seq(&[0, 0, 0], 1), 4).unwrap_err(),
            ProjectionError::LengthMismatch {
                feature: 2,
                states: 3
            }
        );
    }

    #[test]
    fn test_histograms_share_edges_and_cover_all_samples() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 10.0];
        let seq = seq(&[0, 0, 1, 1, 1, 0], 3);
        let hists = state_histograms("speed", &Feature::Scalar(values), &seq, 5).unwrap();
        assert_eq!(hists.edges.min(), 0.0);
        assert_eq!(hists.edges.max(), 10.0);
        assert_eq!(hists.histograms.len(), 3);
        assert_eq!(hists.histograms[0].total(), 3);
        assert_eq!(hists.histograms[1].total(), 3);
        // State 2 never occurs
        assert_eq!(hists.histograms[2].total(), 0);
        assert_eq!(hists.histograms[2].counts().len(), 5);
        for hist in &hists.histograms {
            assert_eq!(hist.out_of_range, 0);
        }
        // The maximum lands in the last bin
        assert_eq!(hists.histograms[0].counts()[4], 1);
    }

    #[test]
    fn test_constant_feature_histogram() {
        let seq = seq(&[0, 1, 0, 1], 2);
        let hists = state_histograms("flat", &Feature::Scalar(vec![2.0; 4]), &seq, 3).unwrap();
        assert!((hists.edges.max() - hists.edges.min() - 1.0).abs() < 1e-12);
        assert_eq!(hists.histograms[0].counts(), vec![0, 2, 0]);
    }

    #[test]
    fn test_angular_histograms() {
        let angles = vec![0.1, PI + 0.1, 0.2, 2.0 * PI - 0.1];
        let seq = seq(&[0, 1, 0, 1], 2);
        let hists =
            state_angular_histograms("direction", &Feature::Scalar(angles), &seq, 4).unwrap();
        assert!(hists.angular);
        assert_eq!(hists.edges.num_bins(), 4);
        assert_eq!(hists.histograms[0].counts(), vec![2, 0, 0, 0]);
        assert_eq!(hists.histograms[1].counts(), vec![0, 0, 1, 1]);
        assert_eq!(
            state_angular_histograms(
                "direction",
                &Feature::Scalar(vec![]),
                &StateSequence::new(vec![], 2).unwrap(),
                0,
            )
            .unwrap_err(),
            ProjectionError::NoBins
        );
    }

    #[test]
    fn test_random_partition_covers_every_sample_once() {
        let mut rng = Pcg64Mcg::seed_from_u64(13);
        for _ in 0..100 {
            let n_states = rng.random_range(1..8);
            let len = rng.random_range(0..200);
            let labels = (0..len)
                .map(|_| rng.random_range(0..n_states))
                .collect::<Vec<_>>();
            let seq = seq(&labels, n_states);
            let indices = (0..len).collect::<Vec<_>>();

            let groups = partition_by_state(&indices, &seq).unwrap();
            assert_eq!(groups.len(), n_states);
            let mut seen = groups.iter().flatten().copied().collect::<Vec<_>>();
            seen.sort_unstable();
            assert_eq!(seen, indices);
            for (state, group) in groups.iter().enumerate() {
                assert!(group.iter().all(|&i| labels[i] == state));
            }
        }
    }
}

//! End-to-end analysis of one session
//!
//! [`Pipeline::run`] executes the stages in order:
//!
//! 1. resample the session to the configured bin width and truncate it
//! 2. extract lag-aligned features ([`FeatureSet::extract`])
//! 3. fit the segmenter and decode a state per sample
//! 4. split the states into segments and project them onto behavior
//!
//! Errors from any stage abort the run and are returned as [`PipelineError`].

use neuroseg_hmm::FitReport;
use serde::{Deserialize, Serialize};

use crate::{
    config::{AnalysisConfig, ConfigError},
    features::{FeatureError, FeatureSet, Kinematics},
    projection::{
        Feature, ProjectionError, SegmentTrace, StateHistograms, state_angular_histograms,
        state_histograms, time_series_overlay, trajectory_overlay,
    },
    segment::{Segment, StateSequence},
    segmenter::{HmmSegmenter, Segmenter, SegmenterError},
    session::{Session, SessionError},
    summary::{StateSummary, TransitionCounts, summarize_states},
};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PipelineError {
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),
    #[display("invalid session: {_0}")]
    Session(SessionError),
    #[display("feature extraction failed: {_0}")]
    Feature(FeatureError),
    #[display("segmentation failed: {_0}")]
    Segmenter(SegmenterError),
    #[display("projection failed: {_0}")]
    Projection(ProjectionError),
}

/// Everything produced by one analysis run.
///
/// The per-sample series (`kinematics`, `position`, `states`) are aligned
/// with each other; `bin_indices` maps them back to session bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub bin_width_ms: f64,
    pub num_channels: usize,
    pub dropped_rows: usize,
    pub bin_indices: Vec<usize>,
    pub fit: Option<FitReport>,
    pub states: StateSequence,
    pub segments: Vec<Segment>,
    pub summaries: Vec<StateSummary>,
    pub transitions: TransitionCounts,
    pub histograms: Vec<StateHistograms>,
    pub kinematics: Kinematics,
    pub position: Vec<[f64; 2]>,
}

impl AnalysisReport {
    /// Speed over time, one trace per segment.
    pub fn speed_overlay(&self) -> Result<Vec<SegmentTrace>, ProjectionError> {
        time_series_overlay(
            &Feature::Scalar(self.kinematics.speed.clone()),
            &self.states,
            self.bin_width_ms,
        )
    }

    /// Finger trajectory, one path per segment.
    pub fn trajectory_overlay(&self) -> Result<Vec<SegmentTrace>, ProjectionError> {
        trajectory_overlay(&Feature::Planar(self.position.clone()), &self.states)
    }

    /// Histograms of the named feature, if it was computed.
    #[must_use]
    pub fn histograms_of(&self, feature: &str) -> Option<&StateHistograms> {
        self.histograms.iter().find(|h| h.feature == feature)
    }
}

/// Runs the analysis stages with a given segmentation backend.
#[derive(Debug, Clone)]
pub struct Pipeline<S> {
    config: AnalysisConfig,
    segmenter: S,
}

impl Pipeline<HmmSegmenter> {
    /// Creates a pipeline with the Gaussian HMM backend configured from
    /// `config.hmm`.
    pub fn new(config: AnalysisConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let segmenter = HmmSegmenter::new(config.hmm.clone());
        Ok(Self { config, segmenter })
    }
}

impl<S> Pipeline<S>
where
    S: Segmenter,
    PipelineError: From<S::Error>,
{
    pub fn with_segmenter(config: AnalysisConfig, segmenter: S) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config, segmenter })
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Brings `session` to the configured bin width and duration.
    pub fn prepare(&self, session: &Session) -> Result<Session, PipelineError> {
        let mut session = if (session.bin_width_ms() - self.config.bin_size_ms).abs() > 1e-9 {
            tracing::info!(
                from_ms = session.bin_width_ms(),
                to_ms = self.config.bin_size_ms,
                "rebinning session"
            );
            session.rebin(self.config.bin_size_ms)?
        } else {
            session.clone()
        };
        if let Some(max_duration_s) = self.config.max_duration_s {
            session = session.truncate(max_duration_s)?;
        }
        tracing::info!(
            bins = session.num_bins(),
            channels = session.num_channels(),
            duration_s = session.duration_s(),
            "prepared session"
        );
        Ok(session)
    }

    pub fn run(&self, session: &Session) -> Result<AnalysisReport, PipelineError> {
        let session = self.prepare(session)?;
        let features = FeatureSet::extract(&session, &self.config.feature_params())?;

        tracing::info!(n_states = self.segmenter.n_states(), "fitting segmenter");
        let model = self.segmenter.fit(features.rates())?;
        let states = self.segmenter.decode(&model, features.rates())?;
        let fit = self.segmenter.fit_report(&model);

        let segments = states.segments();
        tracing::info!(segments = segments.len(), "decoded states");

        let kinematics = features.kinematics().clone();
        let summaries = summarize_states(&kinematics, &states, features.bin_width_ms())?;
        let transitions = TransitionCounts::from_segments(&segments, states.n_states());

        let bins = self.config.histogram_bins;
        let wedges = self.config.angular_wedges;
        let histograms = vec![
            state_histograms("speed", &Feature::Scalar(kinematics.speed.clone()), &states, bins)?,
            state_histograms(
                "radial_position",
                &Feature::Scalar(kinematics.radial_position.clone()),
                &states,
                bins,
            )?,
            state_histograms(
                "acceleration",
                &Feature::Scalar(kinematics.acceleration.clone()),
                &states,
                bins,
            )?,
            state_angular_histograms(
                "direction",
                &Feature::Scalar(kinematics.direction.clone()),
                &states,
                wedges,
            )?,
            state_angular_histograms(
                "angular_position",
                &Feature::Scalar(kinematics.angular_position.clone()),
                &states,
                wedges,
            )?,
        ];

        Ok(AnalysisReport {
            config: self.config.clone(),
            bin_width_ms: features.bin_width_ms(),
            num_channels: features.rates().ncols(),
            dropped_rows: features.dropped_rows(),
            bin_indices: features.bin_indices().to_vec(),
            fit,
            states,
            segments,
            summaries,
            transitions,
            histograms,
            kinematics,
            position: features.position().to_vec(),
        })
    }
}

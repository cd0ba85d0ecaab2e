//! Segmentation backends
//!
//! A [`Segmenter`] fits a latent-state model to a feature matrix (one row per
//! sample, one column per channel) and decodes the most likely state of every
//! sample. [`HmmSegmenter`] is the default backend, a full-covariance Gaussian
//! HMM from `neuroseg-hmm`.

use nalgebra::DMatrix;
use neuroseg_hmm::{FitReport, GaussianHmm, HmmConfig, HmmError, HmmTrainer};

use crate::segment::{SegmentError, StateSequence};

/// A latent-state model that can be fitted and decoded.
pub trait Segmenter {
    type Model;
    type Error;

    /// Number of states produced by [`Segmenter::decode`].
    fn n_states(&self) -> usize;

    /// Estimates model parameters from `features`.
    fn fit(&self, features: &DMatrix<f64>) -> Result<Self::Model, Self::Error>;

    /// Assigns the most likely state to every row of `features`.
    fn decode(
        &self,
        model: &Self::Model,
        features: &DMatrix<f64>,
    ) -> Result<StateSequence, Self::Error>;

    /// Training diagnostics of a fitted model, if the backend records any.
    fn fit_report(&self, _model: &Self::Model) -> Option<FitReport> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum SegmenterError {
    #[display("HMM failed: {_0}")]
    Hmm(HmmError),
    #[display("decoded labels are invalid: {_0}")]
    Labels(SegmentError),
}

/// A fitted HMM together with its training diagnostics.
#[derive(Debug, Clone)]
pub struct FittedHmm {
    pub model: GaussianHmm,
    pub report: FitReport,
}

/// Gaussian HMM segmentation with Viterbi decoding.
#[derive(Debug, Clone)]
pub struct HmmSegmenter {
    trainer: HmmTrainer,
}

impl HmmSegmenter {
    #[must_use]
    pub fn new(config: HmmConfig) -> Self {
        Self {
            trainer: HmmTrainer::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &HmmConfig {
        self.trainer.config()
    }
}

impl Segmenter for HmmSegmenter {
    type Model = FittedHmm;
    type Error = SegmenterError;

    fn n_states(&self) -> usize {
        self.trainer.config().n_states
    }

    fn fit(&self, features: &DMatrix<f64>) -> Result<FittedHmm, SegmenterError> {
        let (model, report) = self.trainer.fit(features)?;
        Ok(FittedHmm { model, report })
    }

    fn decode(
        &self,
        model: &FittedHmm,
        features: &DMatrix<f64>,
    ) -> Result<StateSequence, SegmenterError> {
        let (labels, log_prob) = model.model.decode(features)?;
        tracing::debug!(log_prob, "decoded state path");
        Ok(StateSequence::new(labels, model.model.n_states())?)
    }

    fn fit_report(&self, model: &FittedHmm) -> Option<FitReport> {
        Some(model.report.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_block_structure() {
        let obs = DMatrix::from_fn(60, 1, |t, _| {
            let level = if (t / 20) % 2 == 0 { -5.0 } else { 5.0 };
            level + (t % 3) as f64 * 0.1
        });
        let segmenter = HmmSegmenter::new(HmmConfig {
            n_states: 2,
            seed: 4,
            ..HmmConfig::default()
        });
        let model = segmenter.fit(&obs).unwrap();
        let seq = segmenter.decode(&model, &obs).unwrap();
        assert_eq!(seq.len(), 60);
        assert_eq!(seq.segments().len(), 3);
        assert!(segmenter.fit_report(&model).is_some());
    }

    #[test]
    fn test_fit_errors_are_wrapped() {
        let segmenter = HmmSegmenter::new(HmmConfig {
            n_states: 5,
            ..HmmConfig::default()
        });
        let obs = DMatrix::from_element(3, 2, 1.0);
        assert!(matches!(
            segmenter.fit(&obs),
            Err(SegmenterError::Hmm(HmmError::TooFewObservations { .. }))
        ));
    }
}

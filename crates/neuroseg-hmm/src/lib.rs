//! Hidden Markov models with multivariate Gaussian emissions.
//!
//! This crate fits an HMM with full-covariance Gaussian emissions to a
//! time-by-feature observation matrix and decodes the most likely hidden state
//! sequence.
//!
//! # Overview
//!
//! - [`HmmTrainer`]: Baum-Welch (EM) training with k-means++ initialization
//! - [`GaussianHmm`]: the fitted model; log-likelihood scoring and Viterbi decoding
//! - [`FitReport`]: iteration count, log-likelihood history and convergence flag
//!
//! Observations are `nalgebra::DMatrix<f64>` with one row per time bin and one
//! column per feature. All inference runs in log space so long sequences do
//! not underflow.
//!
//! # Examples
//!
//! ```
//! use nalgebra::DMatrix;
//! use neuroseg_hmm::{HmmConfig, HmmTrainer};
//!
//! // Two well separated regimes, 40 bins each
//! let obs = DMatrix::from_fn(80, 2, |t, j| {
//!     let base = if t < 40 { 0.0 } else { 10.0 };
//!     base + 0.1 * ((t * 7 + j * 3) % 5) as f64
//! });
//!
//! let trainer = HmmTrainer::new(HmmConfig {
//!     n_states: 2,
//!     ..HmmConfig::default()
//! });
//! let (model, report) = trainer.fit(&obs).unwrap();
//! let (labels, _log_prob) = model.decode(&obs).unwrap();
//!
//! assert_eq!(labels.len(), 80);
//! assert_ne!(labels[0], labels[79]);
//! assert!(report.iterations >= 1);
//! ```

mod init;
mod logspace;
mod model;
mod train;

pub use self::{
    model::GaussianHmm,
    train::{FitReport, HmmConfig, HmmTrainer},
};

/// Errors raised while fitting or evaluating a Gaussian HMM.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum HmmError {
    #[display("observation sequence is empty")]
    EmptyObservations,
    #[display("number of states must be at least 1")]
    NoStates,
    #[display("{n_samples} observations cannot support {n_states} states")]
    TooFewObservations { n_samples: usize, n_states: usize },
    #[display("observation has {actual} features, model expects {expected}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[display("only {distinct} distinct observations for {n_states} states")]
    TooFewDistinctObservations { distinct: usize, n_states: usize },
    #[display("observation at row {row} is not finite")]
    NonFiniteObservation { row: usize },
    #[display("covariance of state {state} is singular")]
    SingularCovariance { state: usize },
    #[display("state {state} received no responsibility during EM")]
    DegenerateState { state: usize },
    #[display("k-means initialization failed: {reason}")]
    Clustering { reason: String },
    #[display("invalid model parameters: {reason}")]
    InvalidParameters { reason: String },
}

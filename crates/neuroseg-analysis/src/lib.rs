//! Unsupervised segmentation of neural population activity into behavioral states
//!
//! This crate takes a recording session of binned spike counts with
//! simultaneously tracked finger kinematics, fits a latent-state model to the
//! neural activity alone, and describes how each discovered state relates to
//! behavior.
//!
//! # Overview
//!
//! 1. **Load** ([`session::Session`]): validated spike counts and kinematics,
//!    optionally rebinned and truncated
//! 2. **Features** ([`features::FeatureSet`]): firing rates, Gaussian smoothing
//!    ([`smoothing`]), neural-leads-behavior lag alignment and removal of rows
//!    with missing values
//! 3. **Segment** ([`segmenter::Segmenter`]): fit a Gaussian HMM
//!    ([`segmenter::HmmSegmenter`]) and decode one state per sample
//! 4. **Extract** ([`segment::StateSequence::segments`]): contiguous runs of a
//!    state
//! 5. **Project** ([`projection`], [`summary`]): per-segment overlays, per-state
//!    histograms on shared edges, descriptive statistics and transition counts
//!
//! [`pipeline::Pipeline`] runs all stages with one [`config::AnalysisConfig`].
//!
//! # Examples
//!
//! ```no_run
//! use neuroseg_analysis::{
//!     config::AnalysisConfig,
//!     pipeline::Pipeline,
//!     session::{Session, SessionFile},
//! };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let file: SessionFile = serde_json::from_str(&std::fs::read_to_string("session.json")?)?;
//! let session = Session::try_from(file)?;
//!
//! let report = Pipeline::new(AnalysisConfig::default())?.run(&session)?;
//! for summary in &report.summaries {
//!     println!(
//!         "state {}: {:.1}% of samples in {} segments",
//!         summary.state,
//!         summary.occupancy * 100.0,
//!         summary.segments
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod features;
pub mod pipeline;
pub mod projection;
pub mod segment;
pub mod segmenter;
pub mod session;
pub mod smoothing;
pub mod summary;

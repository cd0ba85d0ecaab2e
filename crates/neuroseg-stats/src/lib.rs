//! Statistical summaries for the neuroseg analysis pipeline.
//!
//! This crate provides the small set of statistical tools the pipeline needs to
//! summarize kinematic features per hidden state:
//!
//! - **Descriptive statistics**: mean, median, variance, standard deviation, range
//! - **Percentiles**: nearest-rank percentiles and quartiles
//! - **Histograms**: fixed-edge linear histograms (edges shared across groups)
//!   and angular histograms over `[0, 2π)`
//! - **Circular statistics**: mean direction and resultant length of angles
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Nearest-rank percentile computation
//! - [`histogram`]: Linear and angular histograms with explicit bin edges
//! - [`circular`]: Statistics of angular data
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use neuroseg_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Histograms sharing the same edges
//!
//! ```
//! use neuroseg_stats::histogram::{BinEdges, Histogram};
//!
//! let all = [0.0, 1.0, 2.0, 3.0, 4.0];
//! let edges = BinEdges::spanning(all, 4).unwrap();
//! let low = Histogram::with_edges(&edges, [0.0, 1.0]);
//! let high = Histogram::with_edges(&edges, [3.0, 4.0]);
//! assert_eq!(low.total() + high.total(), 4);
//! ```
//!
//! ## Angular histograms
//!
//! ```
//! use neuroseg_stats::histogram::Histogram;
//!
//! // Four quarter-turn wedges
//! let histogram = Histogram::angular([0.1, 3.0, 5.0], 4);
//! assert_eq!(histogram.counts(), vec![1, 1, 0, 1]);
//! ```

pub mod circular;
pub mod descriptive;
pub mod histogram;
pub mod percentiles;

//! Analysis parameters
//!
//! [`AnalysisConfig`] gathers every tunable constant of the pipeline. It
//! deserializes from JSON with defaults for missing fields, and is validated
//! once before a run.
//!
//! ```
//! use neuroseg_analysis::config::AnalysisConfig;
//!
//! let config: AnalysisConfig =
//!     serde_json::from_str(r#"{ "lag_ms": 60.0, "hmm": { "n_states": 3 } }"#).unwrap();
//! config.validate().unwrap();
//! assert_eq!(config.lag_bins(), 3);
//! assert_eq!(config.n_states(), 3);
//! assert_eq!(config.bin_size_ms, 20.0);
//! ```

use neuroseg_hmm::HmmConfig;
use serde::{Deserialize, Serialize};

use crate::{features::FeatureParams, smoothing::EdgeMode};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[display("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[display("{field} must be at least 1")]
    Zero { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis bin width; the session is rebinned to this if it differs
    pub bin_size_ms: f64,
    /// Full width of the Gaussian smoothing window; sigma is half of it
    pub smoothing_ms: f64,
    /// How far the neural signal leads behavior
    pub lag_ms: f64,
    /// Only the first part of the session is analyzed; `None` keeps it all
    pub max_duration_s: Option<f64>,
    pub edge_mode: EdgeMode,
    pub hmm: HmmConfig,
    pub histogram_bins: usize,
    pub angular_wedges: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bin_size_ms: 20.0,
            smoothing_ms: 50.0,
            lag_ms: 100.0,
            max_duration_s: Some(600.0),
            edge_mode: EdgeMode::Nearest,
            hmm: HmmConfig::default(),
            histogram_bins: 30,
            angular_wedges: 16,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("bin_size_ms", self.bin_size_ms),
            ("max_duration_s", self.max_duration_s.unwrap_or(1.0)),
            ("hmm.tolerance", self.hmm.tolerance),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        let non_negative = [
            ("smoothing_ms", self.smoothing_ms),
            ("lag_ms", self.lag_ms),
            ("hmm.min_covar", self.hmm.min_covar),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        let counts = [
            ("hmm.n_states", self.hmm.n_states),
            ("hmm.max_iter", self.hmm.max_iter),
            ("histogram_bins", self.histogram_bins),
            ("angular_wedges", self.angular_wedges),
        ];
        if let Some((field, _)) = counts.into_iter().find(|(_, n)| *n == 0) {
            return Err(ConfigError::Zero { field });
        }
        Ok(())
    }

    #[must_use]
    pub fn n_states(&self) -> usize {
        self.hmm.n_states
    }

    /// Lag in whole bins, `round(lag_ms / bin_size_ms)`.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn lag_bins(&self) -> usize {
        (self.lag_ms / self.bin_size_ms).round() as usize
    }

    /// Gaussian sigma in bins, half the smoothing window.
    #[must_use]
    pub fn sigma_bins(&self) -> f64 {
        0.5 * self.smoothing_ms / self.bin_size_ms
    }

    #[must_use]
    pub fn feature_params(&self) -> FeatureParams {
        FeatureParams {
            lag_bins: self.lag_bins(),
            sigma_bins: self.sigma_bins(),
            edge_mode: self.edge_mode,
        }
    }
}

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use neuroseg_analysis::pipeline::AnalysisReport;
use serde::{Deserialize, Serialize};

/// Saved result of `neuroseg analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    pub session: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub report: AnalysisReport,
}

use std::path::PathBuf;

use chrono::Utc;
use neuroseg_analysis::{config::AnalysisConfig, pipeline::Pipeline};

use crate::{
    plot,
    schema::ReportFile,
    util::{self, read_config_file, read_session_file},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    /// Session JSON file
    session: PathBuf,
    /// Analysis parameters JSON file; missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of hidden states
    #[arg(long)]
    n_states: Option<usize>,
    /// Seed for model initialization
    #[arg(long)]
    seed: Option<u64>,
    /// Analysis bin width in milliseconds
    #[arg(long)]
    bin_size_ms: Option<f64>,
    /// Neural-to-behavior lag in milliseconds
    #[arg(long)]
    lag_ms: Option<f64>,
    /// Analyze the whole session instead of only its beginning
    #[arg(long)]
    full_session: bool,
    /// Report output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Directory to write SVG figures into
    #[arg(long)]
    figures_dir: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let mut config = match &arg.config {
        Some(path) => read_config_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(n_states) = arg.n_states {
        config.hmm.n_states = n_states;
    }
    if let Some(seed) = arg.seed {
        config.hmm.seed = seed;
    }
    if let Some(bin_size_ms) = arg.bin_size_ms {
        config.bin_size_ms = bin_size_ms;
    }
    if let Some(lag_ms) = arg.lag_ms {
        config.lag_ms = lag_ms;
    }
    if arg.full_session {
        config.max_duration_s = None;
    }

    let session = read_session_file(&arg.session)?;
    eprintln!(
        "Loaded {}: {} bins x {} channels ({:.1} s at {} ms)",
        arg.session.display(),
        session.num_bins(),
        session.num_channels(),
        session.duration_s(),
        session.bin_width_ms()
    );

    let report = Pipeline::new(config)?.run(&session)?;

    if let Some(fit) = &report.fit {
        eprintln!(
            "HMM: {} iterations, log-likelihood {:.3}{}",
            fit.iterations,
            fit.log_likelihood,
            if fit.converged { "" } else { " (not converged)" }
        );
    }
    eprintln!(
        "{} samples in {} segments ({} rows dropped)",
        report.states.len(),
        report.segments.len(),
        report.dropped_rows
    );
    eprintln!("  State  Occupancy  Segments  Mean dur.  Mean speed");
    for summary in &report.summaries {
        eprintln!(
            "  {:5}  {:8.1}%  {:8}  {:>9}  {:>10}",
            summary.state,
            summary.occupancy * 100.0,
            summary.segments,
            summary
                .mean_segment_ms
                .map_or_else(|| "-".to_owned(), |ms| format!("{ms:.0} ms")),
            summary
                .speed
                .as_ref()
                .map_or_else(|| "-".to_owned(), |s| format!("{:.3}", s.mean)),
        );
    }

    let file = ReportFile {
        session: arg.session.clone(),
        generated_at: Utc::now(),
        report,
    };
    util::save_json(&file, arg.output.as_deref())?;
    if let Some(path) = &arg.output {
        eprintln!("Report saved to {}", path.display());
    }

    if let Some(dir) = &arg.figures_dir {
        let paths = plot::render_all(&file, dir)?;
        eprintln!("Wrote {} figures to {}", paths.len(), dir.display());
    }

    Ok(())
}

use std::path::PathBuf;

use crate::{plot, util::read_report_file};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RenderArg {
    /// Report JSON file written by `analyze`
    report: PathBuf,
    /// Directory to write SVG figures into
    #[arg(long)]
    figures_dir: PathBuf,
}

pub(crate) fn run(arg: &RenderArg) -> anyhow::Result<()> {
    let RenderArg {
        report,
        figures_dir,
    } = arg;
    let file = read_report_file(report)?;
    eprintln!(
        "Rendering report for {} (generated at {})",
        file.session.display(),
        file.generated_at
    );
    for path in plot::render_all(&file, figures_dir)? {
        eprintln!("  {}", path.display());
    }
    Ok(())
}

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{analyze::AnalyzeArg, render::RenderArg, simulate::SimulateArg};

mod analyze;
mod render;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Enable debug-level logging (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Segment a recording session into neural states
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Generate a synthetic recording session
    Simulate(#[clap(flatten)] SimulateArg),
    /// Render figures from a saved analysis report
    Render(#[clap(flatten)] RenderArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.mode {
        Mode::Analyze(arg) => analyze::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
        Mode::Render(arg) => render::run(&arg)?,
    }
    Ok(())
}

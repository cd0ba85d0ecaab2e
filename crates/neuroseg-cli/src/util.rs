use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use neuroseg_analysis::{
    config::AnalysisConfig,
    session::{Session, SessionFile},
};

use crate::schema::ReportFile;

/// Writes `value` as pretty-printed JSON to `path`, or to stdout if `path` is
/// `None`.
pub fn save_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    let (mut writer, target): (Box<dyn Write>, String) = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            (Box::new(BufWriter::new(file)), path.display().to_string())
        }
        None => (Box::new(io::stdout().lock()), "stdout".to_owned()),
    };
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {target}"))?;
    writeln!(writer).with_context(|| format!("Failed to write JSON to {target}"))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush output to {target}"))?;
    Ok(())
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read and validate a recording session from a JSON file
///
/// # Errors
///
/// Returns error if the file cannot be opened or parsed, or if the series
/// are inconsistent (ragged rows, mismatched lengths, bad bin width)
pub fn read_session_file<P>(path: P) -> anyhow::Result<Session>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file: SessionFile = read_json_file("session", path)?;
    Session::try_from(file).with_context(|| format!("Invalid session file: {}", path.display()))
}

/// Read analysis parameters from a JSON file; missing fields take defaults
pub fn read_config_file<P>(path: P) -> anyhow::Result<AnalysisConfig>
where
    P: AsRef<Path>,
{
    read_json_file("config", path)
}

pub fn read_report_file<P>(path: P) -> anyhow::Result<ReportFile>
where
    P: AsRef<Path>,
{
    read_json_file("report", path)
}

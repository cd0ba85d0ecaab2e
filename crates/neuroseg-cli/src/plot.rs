//! SVG figures of an analysis report
//!
//! - `speed_by_state.svg`: speed over time, colored by decoded state
//! - `trajectory_by_state.svg`: finger path, colored by decoded state
//! - `hist_<feature>.svg`: one panel per state; polar wedges for angular
//!   features, bars on shared edges otherwise

use std::{
    f64::consts::TAU,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use neuroseg_analysis::{
    pipeline::AnalysisReport,
    projection::{SegmentTrace, StateColor, StateHistograms, state_color},
};
use neuroseg_stats::histogram::Histogram;
use plotters::{coord::Shift, prelude::*};

use crate::schema::ReportFile;

const PANEL_WIDTH: usize = 420;
const PANEL_HEIGHT: usize = 320;
const PANEL_COLUMNS: usize = 3;
const WEDGE_STEPS: usize = 12;

/// Renders every figure of `file` into `dir` and returns the written paths.
pub fn render_all(file: &ReportFile, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create figures directory: {}", dir.display()))?;
    let report = &file.report;
    let mut paths = Vec::new();

    let path = dir.join("speed_by_state.svg");
    render_speed(report, &path)
        .with_context(|| format!("Failed to render {}", path.display()))?;
    paths.push(path);

    let path = dir.join("trajectory_by_state.svg");
    render_trajectory(report, &path)
        .with_context(|| format!("Failed to render {}", path.display()))?;
    paths.push(path);

    for hists in &report.histograms {
        let path = dir.join(format!("hist_{}.svg", hists.feature));
        let rendered = if hists.angular {
            render_polar_histograms(hists, &path)
        } else {
            render_histograms(hists, &path)
        };
        rendered.with_context(|| format!("Failed to render {}", path.display()))?;
        paths.push(path);
    }
    tracing::info!(figures = paths.len(), dir = %dir.display(), "rendered figures");
    Ok(paths)
}

fn rgb(color: &StateColor) -> RGBColor {
    let [r, g, b] = color.rgb;
    RGBColor(r, g, b)
}

/// Segment traces as polylines, each extended to the first point of the next
/// segment so the drawn curve has no gaps.
fn polylines(traces: &[SegmentTrace]) -> Vec<Vec<(f64, f64)>> {
    traces
        .iter()
        .enumerate()
        .map(|(i, trace)| {
            let next = traces.get(i + 1).and_then(|t| t.points.first());
            trace
                .points
                .iter()
                .chain(next)
                .map(|p| (p[0], p[1]))
                .collect()
        })
        .collect()
}

/// `(min, max)` of finite values, padded by `pad` of the span on each side.
fn padded_range<I>(values: I, pad: f64) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let span = (hi - lo).max(1e-9);
    (lo - span * pad, hi + span * pad)
}

fn draw_segment_traces(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    traces: &[SegmentTrace],
    n_states: usize,
    (x_desc, y_desc): (&str, &str),
) -> anyhow::Result<()> {
    let lines = polylines(traces);
    let (x_min, x_max) = padded_range(lines.iter().flatten().map(|p| p.0), 0.02);
    let (y_min, y_max) = padded_range(lines.iter().flatten().map(|p| p.1), 0.05);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    let mut labeled = vec![false; n_states];
    for (trace, line) in traces.iter().zip(lines) {
        let color = rgb(&trace.color);
        let series = chart.draw_series(LineSeries::new(line, &color))?;
        let label = trace.segment.label;
        if !labeled[label] {
            labeled[label] = true;
            series
                .label(format!("state {label}"))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn render_speed(report: &AnalysisReport, path: &Path) -> anyhow::Result<()> {
    let traces = report.speed_overlay()?;
    let root = SVGBackend::new(path, (1400, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_segment_traces(
        &root,
        "Finger speed by neural state",
        &traces,
        report.states.n_states(),
        ("time (s)", "speed"),
    )?;
    root.present()?;
    Ok(())
}

fn render_trajectory(report: &AnalysisReport, path: &Path) -> anyhow::Result<()> {
    let traces = report.trajectory_overlay()?;
    let root = SVGBackend::new(path, (900, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_segment_traces(
        &root,
        "Finger trajectory by neural state",
        &traces,
        report.states.n_states(),
        ("x", "y"),
    )?;
    root.present()?;
    Ok(())
}

/// Figure size and `(rows, columns)` of a grid with one panel per state.
fn panel_grid(n_states: usize) -> anyhow::Result<((u32, u32), (usize, usize))> {
    let cols = n_states.clamp(1, PANEL_COLUMNS);
    let rows = n_states.div_ceil(cols).max(1);
    let size = (
        u32::try_from(cols * PANEL_WIDTH)?,
        u32::try_from(rows * PANEL_HEIGHT + 40)?,
    );
    Ok((size, (rows, cols)))
}

fn panel_caption(state: usize, hist: &Histogram) -> String {
    match hist.total() {
        0 => format!("state {state} (empty)"),
        n => format!("state {state} (n = {n})"),
    }
}

#[expect(clippy::cast_precision_loss)]
fn render_histograms(hists: &StateHistograms, path: &Path) -> anyhow::Result<()> {
    let n_states = hists.histograms.len();
    let (size, grid) = panel_grid(n_states)?;
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&format!("{} by state", hists.feature), ("sans-serif", 24))?;

    let y_max = hists
        .histograms
        .iter()
        .map(Histogram::max_count)
        .max()
        .unwrap_or(0)
        .max(1) as f64
        * 1.1;
    let x_range = hists.edges.min()..hists.edges.max();

    for (state, (hist, panel)) in hists.histograms.iter().zip(root.split_evenly(grid)).enumerate() {
        let color = rgb(&state_color(state, n_states));
        let mut chart = ChartBuilder::on(&panel)
            .caption(panel_caption(state, hist), ("sans-serif", 16))
            .margin(8)
            .x_label_area_size(30)
            .y_label_area_size(45)
            .build_cartesian_2d(x_range.clone(), 0.0..y_max)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(hists.feature.as_str())
            .y_desc("count")
            .draw()?;
        chart.draw_series(hist.bins.iter().filter(|bin| bin.count > 0).map(|bin| {
            Rectangle::new(
                [(bin.range.start, 0.0), (bin.range.end, bin.count as f64)],
                color.mix(0.8).filled(),
            )
        }))?;
    }
    root.present()?;
    Ok(())
}

/// Closed outline of a circular sector from the origin.
#[expect(clippy::cast_precision_loss)]
fn wedge(start: f64, end: f64, radius: f64) -> Vec<(f64, f64)> {
    std::iter::once((0.0, 0.0))
        .chain((0..=WEDGE_STEPS).map(|i| {
            let angle = start + (end - start) * i as f64 / WEDGE_STEPS as f64;
            (radius * angle.cos(), radius * angle.sin())
        }))
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn render_polar_histograms(hists: &StateHistograms, path: &Path) -> anyhow::Result<()> {
    let n_states = hists.histograms.len();
    let (size, grid) = panel_grid(n_states)?;
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&format!("{} by state", hists.feature), ("sans-serif", 24))?;

    let r_max = hists
        .histograms
        .iter()
        .map(Histogram::max_count)
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    for (state, (hist, panel)) in hists.histograms.iter().zip(root.split_evenly(grid)).enumerate() {
        let color = rgb(&state_color(state, n_states));
        let mut chart = ChartBuilder::on(&panel)
            .caption(panel_caption(state, hist), ("sans-serif", 16))
            .margin(8)
            .build_cartesian_2d(-1.15..1.15, -1.15..1.15)?;
        let rim = wedge(0.0, TAU, 1.0)[1..].to_vec();
        chart.draw_series([
            PathElement::new(rim, BLACK.mix(0.3)),
            PathElement::new(vec![(-1.1, 0.0), (1.1, 0.0)], BLACK.mix(0.15)),
            PathElement::new(vec![(0.0, -1.1), (0.0, 1.1)], BLACK.mix(0.15)),
        ])?;
        chart.draw_series(hist.bins.iter().filter(|bin| bin.count > 0).map(|bin| {
            Polygon::new(
                wedge(bin.range.start, bin.range.end, bin.count as f64 / r_max),
                color.mix(0.8).filled(),
            )
        }))?;
    }
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use nalgebra::DMatrix;
    use neuroseg_analysis::{
        config::AnalysisConfig,
        pipeline::{AnalysisReport, Pipeline},
        segment::StateSequence,
        segmenter::{Segmenter, SegmenterError},
        session::Session,
    };
    use neuroseg_hmm::HmmConfig;

    use super::*;
    use crate::util::{read_report_file, save_json};

    /// Labels the first half of the samples 0 and the rest 2; state 1 stays empty.
    struct SplitSegmenter;

    impl Segmenter for SplitSegmenter {
        type Model = ();
        type Error = SegmenterError;

        fn n_states(&self) -> usize {
            3
        }

        fn fit(&self, _features: &DMatrix<f64>) -> Result<(), SegmenterError> {
            Ok(())
        }

        fn decode(
            &self,
            _model: &(),
            features: &DMatrix<f64>,
        ) -> Result<StateSequence, SegmenterError> {
            let n = features.nrows();
            let labels = (0..n).map(|i| if i < n / 2 { 0 } else { 2 }).collect();
            Ok(StateSequence::new(labels, 3)?)
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            lag_ms: 0.0,
            max_duration_s: None,
            hmm: HmmConfig {
                n_states: 2,
                ..HmmConfig::default()
            },
            ..AnalysisConfig::default()
        }
    }

    fn wrap(report: AnalysisReport) -> ReportFile {
        ReportFile {
            session: PathBuf::from("synthetic.json"),
            generated_at: Utc::now(),
            report,
        }
    }

    fn session() -> Session {
        let num_bins = 120;
        let spikes = DMatrix::from_fn(num_bins, 2, |t, c| {
            let high = (t / 30 + c) % 2 == 0;
            let jitter = ((t * 7 + c * 3) % 5) as f64;
            if high { 8.0 + jitter } else { 1.0 + jitter * 0.2 }
        });
        let vel = (0..num_bins)
            .map(|t| if (t / 30) % 2 == 0 { [1.0, 0.1] } else { [-1.0, -0.1] })
            .collect::<Vec<_>>();
        let mut pos = Vec::with_capacity(num_bins);
        let mut xy = [0.0, 0.0];
        for v in &vel {
            xy = [xy[0] + v[0] * 0.02, xy[1] + v[1] * 0.02];
            pos.push(xy);
        }
        Session::new(20.0, vec![], spikes, pos, vel).unwrap()
    }

    fn report_file() -> ReportFile {
        wrap(Pipeline::new(config()).unwrap().run(&session()).unwrap())
    }

    #[test]
    fn test_unused_state_renders_empty_panels() {
        let report = Pipeline::with_segmenter(config(), SplitSegmenter)
            .unwrap()
            .run(&session())
            .unwrap();
        assert_eq!(report.states.occupancy()[1], 0);
        assert_eq!(report.summaries[1].samples, 0);

        let dir = tempfile::tempdir().unwrap();
        let paths = render_all(&wrap(report), dir.path()).unwrap();
        assert_eq!(paths.len(), 7);
        for name in ["hist_speed.svg", "hist_direction.svg"] {
            let svg = fs::read_to_string(dir.path().join(name)).unwrap();
            assert!(svg.contains("state 1 (empty)"), "{name}");
            assert!(!svg.contains("state 0 (empty)"), "{name}");
        }
    }

    #[test]
    fn test_report_with_out_of_range_label_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut value = serde_json::to_value(report_file()).unwrap();
        value["report"]["states"]["labels"][3] = serde_json::json!(5);
        save_json(&value, Some(&path)).unwrap();

        let err = read_report_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("label 5 at index 3"), "{err:#}");
    }

    #[test]
    fn test_render_all_writes_svg_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = report_file();
        let paths = render_all(&file, dir.path()).unwrap();
        assert_eq!(paths.len(), 2 + file.report.histograms.len());
        for path in &paths {
            let svg = fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"), "{}", path.display());
        }
        assert!(dir.path().join("hist_direction.svg").exists());
    }

    #[test]
    fn test_polylines_connect_segments() {
        let trace = |label, points: Vec<[f64; 2]>| SegmentTrace {
            segment: neuroseg_analysis::segment::Segment {
                start: 0,
                end: points.len(),
                label,
            },
            color: state_color(label, 2),
            points,
        };
        let traces = [
            trace(0, vec![[0.0, 1.0], [1.0, 2.0]]),
            trace(1, vec![[2.0, 3.0]]),
        ];
        let lines = polylines(&traces);
        assert_eq!(lines[0], vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
        assert_eq!(lines[1], vec![(2.0, 3.0)]);
    }

    #[test]
    fn test_wedge_outline() {
        let points = wedge(0.0, TAU / 4.0, 0.5);
        assert_eq!(points.len(), WEDGE_STEPS + 2);
        assert_eq!(points[0], (0.0, 0.0));
        assert!((points[1].0 - 0.5).abs() < 1e-12);
        let last = points[points.len() - 1];
        assert!(last.0.abs() < 1e-12 && (last.1 - 0.5).abs() < 1e-12);
    }
}

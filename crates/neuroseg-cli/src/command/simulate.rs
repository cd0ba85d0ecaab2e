use std::{f64::consts::TAU, path::PathBuf};

use anyhow::Context as _;
use neuroseg_analysis::session::SessionFile;
use rand::{Rng, SeedableRng as _};
use rand_distr::{Distribution as _, Exp, Normal, Poisson};
use rand_pcg::Pcg64Mcg;

use crate::util;

/// Peak modulation of a channel's rate by reach direction
const TUNING_DEPTH: f64 = 1.2;
/// Per-bin velocity noise relative to the regime speed
const VELOCITY_NOISE: f64 = 0.15;
/// Fraction of position kept per second; pulls the finger back towards the origin
const POSITION_RETENTION: f64 = 0.6;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Recording length in seconds
    #[arg(long, default_value_t = 120.0)]
    duration_s: f64,
    /// Bin width in milliseconds
    #[arg(long, default_value_t = 10.0)]
    bin_width_ms: f64,
    /// Number of recording channels
    #[arg(long, default_value_t = 24)]
    channels: usize,
    /// Number of behavioral regimes
    #[arg(long, default_value_t = 4)]
    regimes: usize,
    /// Mean time spent in a regime before switching, in seconds
    #[arg(long, default_value_t = 1.5)]
    mean_dwell_s: f64,
    /// Probability that a bin's kinematics are missing
    #[arg(long, default_value_t = 0.0)]
    missing_fraction: f64,
    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// A reach regime: the finger moves at `speed` along `direction`.
#[derive(Debug, Clone, Copy)]
struct Regime {
    direction: f64,
    speed: f64,
}

/// A cosine-tuned channel with a regime-specific gain.
#[derive(Debug, Clone)]
struct Channel {
    baseline_hz: f64,
    preferred_direction: f64,
    regime_gain: Vec<f64>,
}

impl Channel {
    fn rate_hz(&self, regime: usize, direction: f64) -> f64 {
        let tuning = (TUNING_DEPTH * (direction - self.preferred_direction).cos()).exp();
        self.baseline_hz * self.regime_gain[regime] * tuning
    }
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    anyhow::ensure!(arg.duration_s > 0.0, "duration must be positive");
    anyhow::ensure!(arg.bin_width_ms > 0.0, "bin width must be positive");
    anyhow::ensure!(arg.channels > 0, "at least one channel is required");
    anyhow::ensure!(arg.regimes > 0, "at least one regime is required");
    anyhow::ensure!(
        (0.0..1.0).contains(&arg.missing_fraction),
        "missing fraction must be in [0, 1)"
    );

    let mut rng = Pcg64Mcg::seed_from_u64(arg.seed);
    let (session, labels) = simulate(arg, &mut rng)?;

    let mut occupancy = vec![0_usize; arg.regimes];
    for &label in &labels {
        occupancy[label] += 1;
    }
    let switches = labels.windows(2).filter(|w| w[0] != w[1]).count();
    eprintln!(
        "Simulated {} bins x {} channels with {} regime switches",
        labels.len(),
        arg.channels,
        switches
    );
    for (regime, count) in occupancy.iter().enumerate() {
        eprintln!("  Regime {regime}: {count} bins");
    }

    util::save_json(&session, arg.output.as_deref())?;
    if let Some(path) = &arg.output {
        eprintln!("Session saved to {}", path.display());
    }
    Ok(())
}

/// Generates a session and the true regime of every bin.
#[expect(clippy::cast_precision_loss)]
fn simulate<R>(arg: &SimulateArg, rng: &mut R) -> anyhow::Result<(SessionFile, Vec<usize>)>
where
    R: Rng,
{
    let bin_s = arg.bin_width_ms / 1000.0;
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_bins = (arg.duration_s / bin_s).round() as usize;

    let regimes = (0..arg.regimes)
        .map(|r| Regime {
            direction: TAU * r as f64 / arg.regimes as f64,
            speed: rng.random_range(0.5..2.0),
        })
        .collect::<Vec<_>>();
    let channels = (0..arg.channels)
        .map(|_| Channel {
            baseline_hz: rng.random_range(5.0..20.0),
            preferred_direction: rng.random_range(0.0..TAU),
            regime_gain: (0..arg.regimes).map(|_| rng.random_range(0.5..2.0)).collect(),
        })
        .collect::<Vec<_>>();

    let dwell = Exp::new(1.0 / arg.mean_dwell_s).context("mean dwell time must be positive")?;
    let noise = Normal::new(0.0, VELOCITY_NOISE).context("invalid velocity noise")?;
    let retention = POSITION_RETENTION.powf(bin_s);

    let mut labels = Vec::with_capacity(num_bins);
    let mut spike_counts = Vec::with_capacity(num_bins);
    let mut finger_pos = Vec::with_capacity(num_bins);
    let mut finger_vel = Vec::with_capacity(num_bins);

    let mut regime = rng.random_range(0..arg.regimes);
    let mut remaining_s = dwell.sample(rng);
    let mut pos = [0.0, 0.0];
    for _ in 0..num_bins {
        if remaining_s <= 0.0 {
            if arg.regimes > 1 {
                // Never switch into the current regime
                let next = rng.random_range(0..arg.regimes - 1);
                regime = if next >= regime { next + 1 } else { next };
            }
            remaining_s = dwell.sample(rng);
        }
        remaining_s -= bin_s;

        let Regime { direction, speed } = regimes[regime];
        let vel = [
            speed * (direction.cos() + noise.sample(rng)),
            speed * (direction.sin() + noise.sample(rng)),
        ];
        pos = [
            (pos[0] + vel[0] * bin_s) * retention,
            (pos[1] + vel[1] * bin_s) * retention,
        ];
        let heading = vel[1].atan2(vel[0]);

        let counts = channels
            .iter()
            .map(|channel| {
                let mean = channel.rate_hz(regime, heading) * bin_s;
                let count = Poisson::new(mean)
                    .context("firing rate must be positive")?
                    .sample(rng);
                Ok(Some(count))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let observed = !rng.random_bool(arg.missing_fraction);
        let known = |xy: [f64; 2]| xy.map(|v| observed.then_some(v));

        labels.push(regime);
        spike_counts.push(counts);
        finger_pos.push(known(pos));
        finger_vel.push(known(vel));
    }

    let session = SessionFile {
        bin_width_ms: arg.bin_width_ms,
        channel_names: (0..arg.channels).map(|c| format!("ch{c:02}")).collect(),
        spike_counts,
        finger_pos,
        finger_vel,
    };
    Ok((session, labels))
}

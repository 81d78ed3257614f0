//! Single focus run against the simulated bench.
//!
//! Prints the per-position report as CSV (or JSON) on stdout and records the optimum in
//! the config store so the next run starts from it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use autofocus::{FocusConfig, FocusSearchEngine};
use clap::Parser;
use hardware::{tune_exposure, DeviceMeasurement, ExposureConfig};
use shared::config_storage::{ConfigStorage, LastFocus};
use simulator::{simulated_devices, SimulationConfig};
use test_bench::FocusConfigStore;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one autofocus pass schedule on the simulated bench")]
struct Args {
    /// Starting focuser position (defaults to the last recorded optimum)
    #[arg(long)]
    initial_guess: Option<i32>,

    /// Focus search config JSON (defaults to the stored config, then built-in defaults)
    #[arg(long)]
    focus_config: Option<PathBuf>,

    /// Simulation config JSON
    #[arg(long)]
    sim_config: Option<PathBuf>,

    /// Override the exposures per focus position
    #[arg(long)]
    samples: Option<usize>,

    /// True best-focus position of the simulated optics
    #[arg(long)]
    best_focus: Option<i32>,

    /// Per-frame FWHM noise in pixels
    #[arg(long)]
    noise: Option<f64>,

    /// Probability of a frame reporting no star
    #[arg(long)]
    dropout: Option<f64>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Skip subframing and exposure tuning
    #[arg(long, default_value_t = false)]
    no_tune: bool,

    /// Config store directory (defaults to ~/.cf_config)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Do not record the optimum in the config store
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// Store the effective focus config as the default for later runs
    #[arg(long, default_value_t = false)]
    save_config: bool,

    /// Print the report as JSON instead of CSV
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let storage = match &args.config_dir {
        Some(dir) => ConfigStorage::with_path(dir.clone()),
        None => ConfigStorage::new().context("Failed to locate config directory")?,
    };

    let mut focus_config = match &args.focus_config {
        Some(path) => FocusConfig::load_from_file(path)
            .with_context(|| format!("Failed to load focus config {}", path.display()))?,
        None => match storage.get_focus_config() {
            Some(stored) => stored.context("Failed to read stored focus config")?,
            None => FocusConfig::default(),
        },
    };
    if let Some(samples) = args.samples {
        focus_config.samples_per_position = samples;
    }
    if args.save_config {
        focus_config.validate().context("Refusing to store invalid focus config")?;
        let path = storage
            .save_focus_config(&focus_config)
            .context("Failed to store focus config")?;
        info!("Stored focus config in {}", path.display());
    }

    let mut sim_config = match &args.sim_config {
        Some(path) => SimulationConfig::load_from_file(path)
            .with_context(|| format!("Failed to load simulation config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(best) = args.best_focus {
        sim_config.model.best_position = best;
    }
    if let Some(noise) = args.noise {
        sim_config.fwhm_noise_px = noise;
    }
    if let Some(dropout) = args.dropout {
        sim_config.dropout_probability = dropout;
    }

    let initial_guess = match args.initial_guess {
        Some(guess) => guess,
        None => match storage.get_last_focus() {
            Some(Ok(last)) => {
                info!("Starting from last recorded focus {}", last.position);
                last.position
            }
            Some(Err(e)) => {
                warn!("Ignoring unreadable last focus record: {e}");
                focus_config.initial_guess
            }
            None => focus_config.initial_guess,
        },
    };

    let (focuser, mut camera) = simulated_devices(&sim_config, initial_guess, args.seed)
        .context("Invalid simulation config")?;

    let exposure_time = if args.no_tune {
        ExposureConfig::default().initial_exposure()
    } else {
        let tuning = tune_exposure(&mut camera, &ExposureConfig::default())
            .context("Exposure tuning failed")?;
        info!(
            "Exposure {:.3}s gives peak {:.0} counts",
            tuning.exposure_time.as_secs_f64(),
            tuning.peak_counts
        );
        tuning.exposure_time
    };

    let mut source = DeviceMeasurement::new(focuser, camera, exposure_time)
        .with_poll_interval(Duration::from_millis(1));
    let mut engine = FocusSearchEngine::new(focus_config).context("Invalid focus config")?;

    let report = engine
        .focus_at_point(initial_guess, &mut source)
        .context("Focus run failed")?
        .with_exposure_time(exposure_time.as_secs_f64());

    if args.json {
        serde_json::to_writer_pretty(std::io::stdout().lock(), &report)
            .context("Failed to write report")?;
        println!();
    } else {
        report
            .write_csv(std::io::stdout().lock())
            .context("Failed to write report")?;
    }
    info!("Optimal focus value is {}", report.optimum);

    if !args.no_save {
        let path = storage
            .save_last_focus(&LastFocus::now(report.optimum))
            .context("Failed to record optimum")?;
        info!("Recorded optimum in {}", path.display());
    }

    Ok(())
}

//! Focus survey across a sky grid on the simulated bench.
//!
//! Reference stars come from a flat-text catalog, a JSON index cache, or a
//! synthetic random field. Survey rows are printed as CSV on stdout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use autofocus::{FocusConfig, FocusSearchEngine};
use clap::Parser;
use hardware::{DeviceMeasurement, ExposureConfig};
use shared::catalog_file::load_catalog;
use shared::config_storage::ConfigStorage;
use shared::{BucketConfig, StarCatalog};
use simulator::{random_catalog_entries, simulated_devices, SimulatedMount, SimulationConfig};
use test_bench::{sky_grid, FocusSurvey};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Map best focus across the sky on the simulated bench")]
struct Args {
    /// Flat-text catalog, one "[ra, dec, ...]" star per line
    #[arg(long, conflicts_with = "index")]
    catalog: Option<PathBuf>,

    /// Pre-built catalog index JSON
    #[arg(long)]
    index: Option<PathBuf>,

    /// Write the built index to this JSON file
    #[arg(long)]
    save_index: Option<PathBuf>,

    /// Number of synthetic stars when no catalog is given
    #[arg(long, default_value_t = 20000)]
    synthetic_stars: usize,

    /// RA spacing of the target grid in degrees
    #[arg(long, default_value_t = 60.0)]
    ra_step: f64,

    /// Target declinations in degrees
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 30.0, 60.0])]
    dec: Vec<f64>,

    /// Starting focuser position
    #[arg(long, default_value_t = 6000)]
    initial_guess: i32,

    /// Per-frame FWHM noise in pixels
    #[arg(long, default_value_t = 0.08)]
    noise: f64,

    /// Probability of a frame reporting no star
    #[arg(long, default_value_t = 0.05)]
    dropout: f64,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Config store directory (defaults to ~/.cf_config)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

fn build_catalog(args: &Args, bucket_config: BucketConfig) -> Result<StarCatalog> {
    if let Some(path) = &args.index {
        return StarCatalog::load_from_file(path)
            .with_context(|| format!("Failed to load catalog index {}", path.display()));
    }

    let entries = match &args.catalog {
        Some(path) => load_catalog(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?,
        None => {
            info!("Synthesising {} catalog stars", args.synthetic_stars);
            random_catalog_entries(args.synthetic_stars, &bucket_config, args.seed)
        }
    };
    StarCatalog::build(bucket_config, entries).context("Failed to build catalog index")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let storage = match &args.config_dir {
        Some(dir) => ConfigStorage::with_path(dir.clone()),
        None => ConfigStorage::new().context("Failed to locate config directory")?,
    };
    let bucket_config = match storage.get_bucket_config() {
        Some(stored) => stored.context("Failed to read stored bucket config")?,
        None => BucketConfig::ucac3(),
    };

    let catalog = build_catalog(&args, bucket_config)?;
    if let Err(e) = catalog.validate() {
        bail!("Catalog index failed validation: {e}");
    }
    info!(
        "Catalog ready: {} stars in {} buckets",
        catalog.len(),
        catalog.bucket_count()
    );
    if let Some(path) = &args.save_index {
        catalog
            .save_to_file(path)
            .with_context(|| format!("Failed to write catalog index {}", path.display()))?;
    }

    let targets = sky_grid(args.ra_step, &args.dec).context("Invalid target grid")?;

    let sim_config = SimulationConfig {
        fwhm_noise_px: args.noise,
        dropout_probability: args.dropout,
        ..Default::default()
    };
    let (focuser, camera) = simulated_devices(&sim_config, args.initial_guess, args.seed)
        .context("Invalid simulation config")?;
    let exposure = ExposureConfig::default();
    let source = DeviceMeasurement::new(focuser, camera, exposure.initial_exposure())
        .with_poll_interval(Duration::from_millis(1));
    let engine = FocusSearchEngine::new(FocusConfig::default()).context("Invalid focus config")?;

    let mut survey = FocusSurvey::new(&catalog, engine, source, SimulatedMount::new())?
        .with_exposure_tuning(exposure);
    let outcome = survey
        .run(&targets, args.initial_guess)
        .context("Survey aborted")?;

    for skipped in &outcome.skipped {
        warn!("Target {} {} skipped: {:?}", skipped.index, skipped.target, skipped.reason);
    }
    outcome
        .write_csv(std::io::stdout().lock())
        .context("Failed to write survey")?;

    Ok(())
}

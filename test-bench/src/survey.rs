//! Sky survey of best focus: for each target, focus on the nearest catalog star.
//!
//! Per target the survey
//! 1. looks up the nearest reference star in the [`StarCatalog`],
//! 2. slews the mount to it,
//! 3. optionally subframes on the star and tunes the exposure time,
//! 4. runs a full focus search seeded with the previous target's optimum.
//!
//! Targets with no usable reference star, or where no position gave a valid
//! measurement, are skipped and logged. Any device error aborts the survey.

use std::io::Write;

use autofocus::{FocusError, FocusReport, FocusSearchEngine};
use hardware::{
    tune_exposure, CameraInterface, DeviceMeasurement, ExposureConfig, FocuserInterface,
    HardwareError, MountInterface,
};
use serde::{Deserialize, Serialize};
use shared::{CatalogError, Coordinate, CoordinateError, StarCatalog};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that abort a survey.
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Invalid sky grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid coordinate: {0}")]
    Coordinate(#[from] CoordinateError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Mount failed slewing to {star}: {source}")]
    Mount {
        star: Coordinate,
        #[source]
        source: HardwareError,
    },

    #[error("Camera failed during field setup on {star}: {source}")]
    FieldSetup {
        star: Coordinate,
        #[source]
        source: HardwareError,
    },

    #[error("Focus run failed on {star}: {source}")]
    Focus {
        star: Coordinate,
        #[source]
        source: FocusError,
    },
}

/// Result type for survey operations.
pub type SurveyResult<T> = Result<T, SurveyError>;

/// Ordered RA/Dec target grid: for each declination, RA from 0 in `ra_step_deg` steps.
pub fn sky_grid(ra_step_deg: f64, dec_values: &[f64]) -> SurveyResult<Vec<Coordinate>> {
    if !(ra_step_deg.is_finite() && ra_step_deg > 0.0 && ra_step_deg <= 360.0) {
        return Err(SurveyError::InvalidGrid(format!(
            "RA step must be in (0, 360], got {ra_step_deg}"
        )));
    }
    let ra_count = (360.0 / ra_step_deg).ceil() as usize;

    let mut grid = Vec::with_capacity(ra_count * dec_values.len());
    for &dec in dec_values {
        for k in 0..ra_count {
            let ra = k as f64 * ra_step_deg;
            if ra < 360.0 {
                grid.push(Coordinate::new(ra, dec)?);
            }
        }
    }
    Ok(grid)
}

/// One focused target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
    pub target_ra: f64,
    pub target_dec: f64,
    pub star_ra: f64,
    pub star_dec: f64,
    pub optimum_focus: i32,
    pub mean_fwhm_px: f64,
    pub positions: usize,
    pub exposures: usize,
    pub exposure_s: Option<f64>,
}

impl SurveyRow {
    fn new(target: Coordinate, star: Coordinate, report: &FocusReport) -> Self {
        Self {
            target_ra: target.ra,
            target_dec: target.dec,
            star_ra: star.ra,
            star_dec: star.dec,
            optimum_focus: report.optimum,
            mean_fwhm_px: report.best().map_or(f64::NAN, |b| b.mean),
            positions: report.rows.len(),
            exposures: report.total_exposures(),
            exposure_s: report.exposure_time_s,
        }
    }
}

/// Why a target produced no row.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No reference star could be looked up for the target
    NoReferenceStar(CatalogError),
    /// The focus run measured nothing usable at the reference star
    NoUsableFocus { star: Coordinate, positions_visited: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTarget {
    /// Position of the target in the input list
    pub index: usize,
    pub target: Coordinate,
    pub reason: SkipReason,
}

/// Rows for focused targets plus the targets that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyOutcome {
    pub rows: Vec<SurveyRow>,
    pub skipped: Vec<SkippedTarget>,
}

impl SurveyOutcome {
    /// Write the rows as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Drives the mount, focuser and camera across a list of sky targets.
pub struct FocusSurvey<'a, F, C, M> {
    catalog: &'a StarCatalog,
    engine: FocusSearchEngine,
    source: DeviceMeasurement<F, C>,
    mount: M,
    exposure: Option<ExposureConfig>,
}

impl<'a, F, C, M> FocusSurvey<'a, F, C, M>
where
    F: FocuserInterface,
    C: CameraInterface,
    M: MountInterface,
{
    /// Set up a survey over a catalog that passes validation.
    pub fn new(
        catalog: &'a StarCatalog,
        engine: FocusSearchEngine,
        source: DeviceMeasurement<F, C>,
        mount: M,
    ) -> SurveyResult<Self> {
        catalog.validate()?;
        Ok(Self {
            catalog,
            engine,
            source,
            mount,
            exposure: None,
        })
    }

    /// Tune the exposure time on every reference star before focusing.
    pub fn with_exposure_tuning(mut self, config: ExposureConfig) -> Self {
        self.exposure = Some(config);
        self
    }

    pub fn mount(&self) -> &M {
        &self.mount
    }

    pub fn into_parts(self) -> (DeviceMeasurement<F, C>, M) {
        (self.source, self.mount)
    }

    /// Visit `targets` in order, starting the first focus run at `initial_guess`.
    pub fn run(&mut self, targets: &[Coordinate], initial_guess: i32) -> SurveyResult<SurveyOutcome> {
        let mut outcome = SurveyOutcome::default();
        let mut guess = initial_guess;

        for (index, &target) in targets.iter().enumerate() {
            let star = match self.catalog.find_nearest(&target) {
                Ok(star) => star,
                Err(err @ (CatalogError::OutOfRange { .. } | CatalogError::NotFound { .. })) => {
                    warn!("Skipping target {index} {target}: {err}");
                    outcome.skipped.push(SkippedTarget {
                        index,
                        target,
                        reason: SkipReason::NoReferenceStar(err),
                    });
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            info!("Target {index} {target}: reference star {star}");
            self.mount
                .slew_to(star)
                .map_err(|source| SurveyError::Mount { star, source })?;

            if let Some(config) = &self.exposure {
                let tuning = tune_exposure(self.source.camera_mut(), config)
                    .map_err(|source| SurveyError::FieldSetup { star, source })?;
                self.source.set_exposure_time(tuning.exposure_time);
            }
            let exposure_s = self.source.exposure_time().as_secs_f64();

            match self.engine.focus_at_point(guess, &mut self.source) {
                Ok(report) => {
                    let report = report.with_exposure_time(exposure_s);
                    info!("Target {index}: best focus {}", report.optimum);
                    guess = report.optimum;
                    outcome.rows.push(SurveyRow::new(target, star, &report));
                }
                Err(FocusError::NoUsableFocus { positions_visited }) => {
                    warn!("Skipping target {index} {target}: no usable focus data");
                    outcome.skipped.push(SkippedTarget {
                        index,
                        target,
                        reason: SkipReason::NoUsableFocus {
                            star,
                            positions_visited,
                        },
                    });
                }
                Err(source) => return Err(SurveyError::Focus { star, source }),
            }
        }

        info!(
            "Survey finished: {} targets focused, {} skipped",
            outcome.rows.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use autofocus::FocusConfig;
    use shared::BucketConfig;
    use simulator::{
        simulated_devices, SimulatedCamera, SimulatedFocuser, SimulatedMount, SimulationConfig,
    };
    use std::time::Duration;

    fn coord(ra: f64, dec: f64) -> Coordinate {
        Coordinate::new(ra, dec).unwrap()
    }

    fn catalog() -> StarCatalog {
        let stars = [coord(10.0, 0.2), coord(50.0, 30.2), coord(200.0, 60.3)];
        StarCatalog::build(BucketConfig::ucac3(), stars).unwrap()
    }

    fn source(
        config: &SimulationConfig,
    ) -> DeviceMeasurement<SimulatedFocuser, SimulatedCamera> {
        let (focuser, camera) = simulated_devices(config, 6000, Some(11)).unwrap();
        DeviceMeasurement::new(focuser, camera, Duration::from_millis(500))
            .with_poll_interval(Duration::ZERO)
    }

    fn quiet() -> SimulationConfig {
        SimulationConfig {
            fwhm_noise_px: 0.0,
            dropout_probability: 0.0,
            ..Default::default()
        }
    }

    fn engine() -> FocusSearchEngine {
        FocusSearchEngine::new(FocusConfig::default()).unwrap()
    }

    #[test]
    fn test_sky_grid() {
        let grid = sky_grid(90.0, &[0.0, 45.0]).unwrap();
        let pairs: Vec<(f64, f64)> = grid.iter().map(|c| (c.ra, c.dec)).collect();
        assert_eq!(
            pairs,
            vec![
                (0.0, 0.0),
                (90.0, 0.0),
                (180.0, 0.0),
                (270.0, 0.0),
                (0.0, 45.0),
                (90.0, 45.0),
                (180.0, 45.0),
                (270.0, 45.0)
            ]
        );
    }

    #[test]
    fn test_sky_grid_uneven_step() {
        let grid = sky_grid(7.0, &[10.0]).unwrap();
        assert_eq!(grid.len(), 52);
        assert_relative_eq!(grid.last().unwrap().ra, 357.0);
    }

    #[test]
    fn test_sky_grid_rejects_bad_input() {
        assert!(matches!(sky_grid(0.0, &[0.0]), Err(SurveyError::InvalidGrid(_))));
        assert!(matches!(sky_grid(f64::NAN, &[0.0]), Err(SurveyError::InvalidGrid(_))));
        assert!(matches!(sky_grid(90.0, &[95.0]), Err(SurveyError::Coordinate(_))));
    }

    #[test]
    fn test_survey_focuses_each_target() {
        let catalog = catalog();
        let mut survey =
            FocusSurvey::new(&catalog, engine(), source(&quiet()), SimulatedMount::new()).unwrap();

        let targets = [coord(12.0, 0.1), coord(52.0, 30.0)];
        let outcome = survey.run(&targets, 6000).unwrap();

        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!((outcome.rows[0].star_ra, outcome.rows[0].star_dec), (10.0, 0.2));
        assert_eq!((outcome.rows[1].star_ra, outcome.rows[1].star_dec), (50.0, 30.2));
        for row in &outcome.rows {
            assert!((row.optimum_focus - 6130).abs() <= 100);
            assert_eq!(row.exposure_s, Some(0.5));
        }
        assert_eq!(
            survey.mount().slews(),
            &[coord(10.0, 0.2), coord(50.0, 30.2)]
        );
    }

    #[test]
    fn test_second_run_starts_from_previous_optimum() {
        let catalog = catalog();
        let mut survey =
            FocusSurvey::new(&catalog, engine(), source(&quiet()), SimulatedMount::new()).unwrap();

        let outcome = survey.run(&[coord(12.0, 0.1), coord(52.0, 30.0)], 6000).unwrap();
        // 7 coarse positions, then 2 new ones in each refinement pass
        assert_eq!(outcome.rows[0].positions, 11);
        assert!(outcome.rows[1].positions <= 11);
        assert_eq!(outcome.rows[1].optimum_focus, outcome.rows[0].optimum_focus);
    }

    #[test]
    fn test_targets_without_stars_are_skipped() {
        let catalog = catalog();
        let mut survey =
            FocusSurvey::new(&catalog, engine(), source(&quiet()), SimulatedMount::new()).unwrap();

        let targets = [coord(0.0, -45.0), coord(100.0, 10.0), coord(12.0, 0.1)];
        let outcome = survey.run(&targets, 6000).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].index, 0);
        assert!(matches!(
            outcome.skipped[0].reason,
            SkipReason::NoReferenceStar(CatalogError::OutOfRange { .. })
        ));
        assert!(matches!(
            outcome.skipped[1].reason,
            SkipReason::NoReferenceStar(CatalogError::NotFound { .. })
        ));
        assert_eq!(survey.mount().slews().len(), 1);
    }

    #[test]
    fn test_unusable_focus_is_skipped() {
        let catalog = catalog();
        let config = SimulationConfig {
            dropout_probability: 1.0,
            ..quiet()
        };
        let mut survey =
            FocusSurvey::new(&catalog, engine(), source(&config), SimulatedMount::new()).unwrap();

        let outcome = survey.run(&[coord(12.0, 0.1)], 6000).unwrap();
        assert!(outcome.rows.is_empty());
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::NoUsableFocus {
                star: coord(10.0, 0.2),
                positions_visited: 11
            }
        );
    }

    #[test]
    fn test_mount_failure_aborts() {
        let catalog = catalog();
        let mut survey = FocusSurvey::new(
            &catalog,
            engine(),
            source(&quiet()),
            SimulatedMount::failing_on(1),
        )
        .unwrap();

        let err = survey
            .run(&[coord(12.0, 0.1), coord(52.0, 30.0)], 6000)
            .unwrap_err();
        assert!(matches!(err, SurveyError::Mount { .. }));
    }

    #[test]
    fn test_focuser_failure_aborts() {
        let catalog = catalog();
        // coarse grid from 11500 runs past the end of travel
        let mut survey =
            FocusSurvey::new(&catalog, engine(), source(&quiet()), SimulatedMount::new()).unwrap();
        let err = survey.run(&[coord(12.0, 0.1)], 11500).unwrap_err();
        assert!(matches!(err, SurveyError::Focus { .. }));
    }

    #[test]
    fn test_exposure_tuning_per_target() {
        let catalog = catalog();
        // bright enough to overexpose at 0.5 s
        let config = SimulationConfig {
            star_peak_rate: 80000.0,
            ..quiet()
        };
        let mut survey =
            FocusSurvey::new(&catalog, engine(), source(&config), SimulatedMount::new())
                .unwrap()
                .with_exposure_tuning(ExposureConfig::default());

        let outcome = survey.run(&[coord(12.0, 0.1)], 6000).unwrap();
        assert_relative_eq!(outcome.rows[0].exposure_s.unwrap(), 0.25);

        let (source, _) = survey.into_parts();
        assert_eq!(source.exposure_time(), Duration::from_millis(250));
        let (_, camera) = source.into_parts();
        assert_eq!(camera.subframe().width, 100);
        assert!(camera.subframe().contains(402, 231));
    }

    #[test]
    fn test_inconsistent_catalog_rejected() {
        let config = BucketConfig::ucac3();
        let mut buckets = vec![Vec::new(); config.bucket_count];
        buckets[0].push(coord(10.0, 30.0));
        let catalog = StarCatalog::from_buckets(config, buckets).unwrap();

        let result = FocusSurvey::new(&catalog, engine(), source(&quiet()), SimulatedMount::new());
        assert!(matches!(
            result,
            Err(SurveyError::Catalog(CatalogError::IndexInconsistent { .. }))
        ));
    }

    #[test]
    fn test_write_csv() {
        let outcome = SurveyOutcome {
            rows: vec![SurveyRow {
                target_ra: 12.0,
                target_dec: 0.1,
                star_ra: 10.0,
                star_dec: 0.2,
                optimum_focus: 6100,
                mean_fwhm_px: 2.25,
                positions: 11,
                exposures: 44,
                exposure_s: Some(0.5),
            }],
            skipped: Vec::new(),
        };
        let mut out = Vec::new();
        outcome.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "target_ra,target_dec,star_ra,star_dec,optimum_focus,mean_fwhm_px,positions,exposures,exposure_s"
        );
        assert_eq!(lines[1], "12.0,0.1,10.0,0.2,6100,2.25,11,44,0.5");
    }
}

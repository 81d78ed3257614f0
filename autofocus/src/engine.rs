//! Coarse-to-fine focus search.
//!
//! A run starts from an initial guess and executes a schedule of passes. Each
//! pass samples a grid `center + k * step` for all `|k * step| <= reach`
//! around the best position found so far. Positions measured earlier in the
//! run are culled from the grid, so narrower passes only spend exposures on
//! the handful of new positions near the optimum:
//!
//! ```text
//! pass 1 (1500, 500):  4500 5000 5500 6000 6500 7000 7500   center 6000
//! pass 2 ( 300, 200):                 5800 [6000] 6200      center 6000 -> 6200
//! pass 3 ( 100, 100):                      6100 [6200] 6300
//! ```
//!
//! A pass whose grid is fully culled measures nothing and is not an error.

use crate::config::{FocusConfig, FocusPass};
use crate::error::{FocusError, FocusResult};
use crate::measurement::MeasurementSource;
use crate::report::FocusReport;
use crate::run_state::FocusRunState;
use crate::sample::{FocusPointStats, Sample};
use log::{debug, info, warn};

/// Stateful focus search controller.
///
/// Owns the [`FocusRunState`] of the current run. One engine drives one
/// focuser; calls are sequential and block on the measurement source.
#[derive(Debug, Clone)]
pub struct FocusSearchEngine {
    config: FocusConfig,
    state: FocusRunState,
}

impl FocusSearchEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: FocusConfig) -> FocusResult<Self> {
        config.validate()?;
        let state = FocusRunState::new(config.initial_guess);
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    /// State of the current (or last) run, including partial data after a failure.
    pub fn run_state(&self) -> &FocusRunState {
        &self.state
    }

    /// Discard the current run and start over from `initial_guess`.
    pub fn reset(&mut self, initial_guess: i32) {
        self.state = FocusRunState::new(initial_guess);
    }

    /// Measure `sample_count` exposures at `focus_position` and record their stats.
    ///
    /// A position already visited in this run is never re-measured; its
    /// stored stats are returned unchanged.
    pub fn sample_position<S>(
        &mut self,
        focus_position: i32,
        sample_count: usize,
        source: &mut S,
    ) -> FocusResult<FocusPointStats>
    where
        S: MeasurementSource + ?Sized,
    {
        if let Some(existing) = self.state.get(focus_position) {
            debug!("Focus {focus_position} already sampled, reusing stats");
            return Ok(*existing);
        }

        let device_failure = |failure| FocusError::DeviceFailure {
            focus_position,
            source: failure,
        };

        source.move_to(focus_position).map_err(device_failure)?;

        let mut samples: Vec<Sample> = Vec::with_capacity(sample_count);
        for _ in 0..sample_count {
            let sample = source.measure(focus_position).map_err(device_failure)?;
            debug!(
                "Focus {focus_position}: FWHM {:.3}{}",
                sample.metric,
                if sample.valid { "" } else { " (invalid)" }
            );
            samples.push(sample);
        }

        let stats = FocusPointStats::from_samples(focus_position, &samples);
        if !stats.has_valid_data() {
            warn!(
                "Focus {focus_position}: no valid samples out of {}",
                stats.sample_count
            );
        }
        self.state.record(stats);
        Ok(stats)
    }

    /// Sample the grid within `reach` of the current optimum, skipping visited positions.
    ///
    /// The grid is fixed from the optimum at the start of the pass; the
    /// optimum itself is re-selected after every new position. Positions
    /// outside the configured travel limits are skipped. Returns the stats of
    /// the newly measured positions in ascending order.
    pub fn sample_range<S>(
        &mut self,
        reach: i32,
        step: i32,
        sample_count: usize,
        source: &mut S,
    ) -> FocusResult<Vec<FocusPointStats>>
    where
        S: MeasurementSource + ?Sized,
    {
        FocusPass::new(reach, step).validate()?;

        let center = self.state.optimum();
        let half_steps = i64::from(reach / step);
        let grid: Vec<i32> = (-half_steps..=half_steps)
            .filter_map(|k| i32::try_from(i64::from(center) + k * i64::from(step)).ok())
            .filter(|&p| self.config.within_limits(p))
            .collect();
        let new_positions: Vec<i32> = grid
            .iter()
            .copied()
            .filter(|&p| !self.state.contains(p))
            .collect();

        info!(
            "Pass reach={reach} step={step} around {center}: {} new positions, {} culled",
            new_positions.len(),
            grid.len() - new_positions.len()
        );

        let mut measured = Vec::with_capacity(new_positions.len());
        for position in new_positions {
            measured.push(self.sample_position(position, sample_count, source)?);
        }
        Ok(measured)
    }

    /// Best focus position of the current run.
    ///
    /// Before anything is measured this is the initial guess. Fails with
    /// `NoUsableFocus` when positions were visited but none produced valid data.
    pub fn optimum(&self) -> FocusResult<i32> {
        if !self.state.is_empty() && !self.state.has_usable_data() {
            return Err(FocusError::NoUsableFocus {
                positions_visited: self.state.len(),
            });
        }
        Ok(self.state.optimum())
    }

    /// Run the configured pass schedule from `initial_guess`.
    ///
    /// A device failure aborts the run; the partial state stays available
    /// through [`FocusSearchEngine::run_state`].
    pub fn focus_at_point<S>(&mut self, initial_guess: i32, source: &mut S) -> FocusResult<FocusReport>
    where
        S: MeasurementSource + ?Sized,
    {
        self.reset(initial_guess);
        let sample_count = self.config.samples_per_position;
        let passes = self.config.passes.clone();
        info!(
            "Starting focus run from {initial_guess}: {} passes, {sample_count} exposures per position",
            passes.len()
        );

        for pass in passes {
            self.sample_range(pass.reach, pass.step, sample_count, source)?;
        }

        let report = FocusReport::from_run(&self.state, sample_count)?;
        info!(
            "Optimal focus value is {} ({} positions, {} exposures)",
            report.optimum,
            report.rows.len(),
            report.total_exposures()
        );
        Ok(report)
    }
}

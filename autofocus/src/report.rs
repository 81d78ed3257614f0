//! Focus run results for CSV export and V-curve plotting.

use crate::error::{FocusError, FocusResult};
use crate::run_state::{select_optimum, FocusRunState};
use crate::sample::FocusPointStats;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Outcome of a completed focus run: every visited position plus the optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusReport {
    /// Per-position statistics in visit order
    pub rows: Vec<FocusPointStats>,
    /// Best focuser position
    pub optimum: i32,
    /// Exposures requested at each position
    pub samples_per_position: usize,
    /// Exposure time used for every frame, if known
    pub exposure_time_s: Option<f64>,
}

#[derive(Serialize)]
struct CsvRow {
    focus: i32,
    mean_fwhm_px: f64,
    fwhm_stddev_px: f64,
    exposure_s: Option<f64>,
    samples: usize,
    invalid_samples: usize,
}

impl FocusReport {
    /// Snapshot a run. Fails with `NoUsableFocus` if no position produced valid data.
    pub fn from_run(state: &FocusRunState, samples_per_position: usize) -> FocusResult<Self> {
        let best = select_optimum(state.points()).ok_or(FocusError::NoUsableFocus {
            positions_visited: state.len(),
        })?;

        Ok(Self {
            rows: state.points().to_vec(),
            optimum: best.focus_position,
            samples_per_position,
            exposure_time_s: None,
        })
    }

    pub fn with_exposure_time(mut self, exposure_time_s: f64) -> Self {
        self.exposure_time_s = Some(exposure_time_s);
        self
    }

    /// Row for the optimum position.
    pub fn best(&self) -> Option<&FocusPointStats> {
        self.rows.iter().find(|r| r.focus_position == self.optimum)
    }

    /// Total exposures taken across the run.
    pub fn total_exposures(&self) -> usize {
        self.rows.iter().map(|r| r.sample_count).sum()
    }

    /// Rows sorted by focus position, for plotting a V-curve.
    pub fn v_curve(&self) -> Vec<FocusPointStats> {
        let mut rows = self.rows.clone();
        rows.sort_by_key(|r| r.focus_position);
        rows
    }

    /// Write the rows as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(CsvRow {
                focus: row.focus_position,
                mean_fwhm_px: row.mean,
                fwhm_stddev_px: row.stdev,
                exposure_s: self.exposure_time_s,
                samples: row.sample_count,
                invalid_samples: row.invalid_count,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

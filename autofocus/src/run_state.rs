//! Per-run record of visited focus positions and the running optimum.

use crate::sample::FocusPointStats;
use serde::{Deserialize, Serialize};

/// Pick the best position among `points`.
///
/// Positions without valid samples are never candidates. Among the rest,
/// only those with the fewest invalid exposures are considered, and of those
/// the smallest mean wins. Equal means keep the earliest visited position.
pub fn select_optimum(points: &[FocusPointStats]) -> Option<&FocusPointStats> {
    let fewest_invalid = points
        .iter()
        .filter(|p| p.has_valid_data())
        .map(|p| p.invalid_count)
        .min()?;

    points
        .iter()
        .filter(|p| p.has_valid_data() && p.invalid_count == fewest_invalid)
        .fold(None, |best: Option<&FocusPointStats>, p| match best {
            Some(b) if b.mean <= p.mean => Some(b),
            _ => Some(p),
        })
}

/// State of one focus run.
///
/// Positions are kept in visit order and never repeat. The optimum starts at
/// the initial guess and moves only when a position with usable data is
/// recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusRunState {
    initial_guess: i32,
    points: Vec<FocusPointStats>,
    optimum: i32,
}

impl FocusRunState {
    pub fn new(initial_guess: i32) -> Self {
        Self {
            initial_guess,
            points: Vec::new(),
            optimum: initial_guess,
        }
    }

    pub fn initial_guess(&self) -> i32 {
        self.initial_guess
    }

    /// Current best position, used as the center of the next pass.
    pub fn optimum(&self) -> i32 {
        self.optimum
    }

    /// Stats for every visited position, in visit order.
    pub fn points(&self) -> &[FocusPointStats] {
        &self.points
    }

    pub fn positions(&self) -> impl Iterator<Item = i32> + '_ {
        self.points.iter().map(|p| p.focus_position)
    }

    pub fn get(&self, focus_position: i32) -> Option<&FocusPointStats> {
        self.points
            .iter()
            .find(|p| p.focus_position == focus_position)
    }

    pub fn contains(&self, focus_position: i32) -> bool {
        self.get(focus_position).is_some()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when at least one visited position produced a valid sample.
    pub fn has_usable_data(&self) -> bool {
        self.points.iter().any(FocusPointStats::has_valid_data)
    }

    /// Append stats for a newly visited position and re-select the optimum.
    ///
    /// Returns false (and changes nothing) if the position was already recorded.
    pub(crate) fn record(&mut self, stats: FocusPointStats) -> bool {
        if self.contains(stats.focus_position) {
            return false;
        }
        self.points.push(stats);
        if let Some(best) = select_optimum(&self.points) {
            self.optimum = best.focus_position;
        }
        true
    }
}

//! Focus run configuration.

use crate::error::{FocusError, FocusResult};
use serde::{Deserialize, Serialize};

/// One coarse-to-fine pass: sample every `step` within `reach` of the current optimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPass {
    /// Half-width of the sampled window in focuser steps
    pub reach: i32,
    /// Spacing between sampled positions in focuser steps
    pub step: i32,
}

impl FocusPass {
    pub const fn new(reach: i32, step: i32) -> Self {
        Self { reach, step }
    }

    pub fn validate(&self) -> FocusResult<()> {
        if self.step <= 0 {
            return Err(FocusError::InvalidConfig(format!(
                "pass step must be positive, got {}",
                self.step
            )));
        }
        if self.reach < 0 {
            return Err(FocusError::InvalidConfig(format!(
                "pass reach must be non-negative, got {}",
                self.reach
            )));
        }
        Ok(())
    }
}

/// Standard three-pass schedule: wide 500-step survey, then 200 and 100 step refinement.
pub const STANDARD_PASSES: [FocusPass; 3] = [
    FocusPass::new(1500, 500),
    FocusPass::new(300, 200),
    FocusPass::new(100, 100),
];

/// Default number of exposures per focus position
pub const DEFAULT_SAMPLES_PER_POSITION: usize = 4;

/// Default starting guess for the best focuser position
pub const DEFAULT_INITIAL_GUESS: i32 = 6000;

/// Configuration for a focus run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Passes executed in order, each centred on the optimum found so far
    pub passes: Vec<FocusPass>,
    /// Exposures taken at each newly visited position
    pub samples_per_position: usize,
    /// Best guess for the optimum before any measurement
    pub initial_guess: i32,
    /// Lowest position the focuser can reach
    pub min_position: Option<i32>,
    /// Highest position the focuser can reach
    pub max_position: Option<i32>,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            passes: STANDARD_PASSES.to_vec(),
            samples_per_position: DEFAULT_SAMPLES_PER_POSITION,
            initial_guess: DEFAULT_INITIAL_GUESS,
            min_position: Some(0),
            max_position: None,
        }
    }
}

impl FocusConfig {
    pub fn validate(&self) -> FocusResult<()> {
        if self.passes.is_empty() {
            return Err(FocusError::InvalidConfig(
                "at least one pass is required".to_string(),
            ));
        }
        for pass in &self.passes {
            pass.validate()?;
        }
        if self.samples_per_position == 0 {
            return Err(FocusError::InvalidConfig(
                "samples_per_position must be at least 1".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_position, self.max_position) {
            if min > max {
                return Err(FocusError::InvalidConfig(format!(
                    "min_position {min} exceeds max_position {max}"
                )));
            }
        }
        Ok(())
    }

    /// Whether `position` lies within the focuser's travel limits.
    pub fn within_limits(&self, position: i32) -> bool {
        self.min_position.map_or(true, |min| position >= min)
            && self.max_position.map_or(true, |max| position <= max)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

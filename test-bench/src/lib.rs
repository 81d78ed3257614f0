//! Bench-level orchestration of focus runs across the sky.

pub mod focus_settings;
pub mod survey;

pub use focus_settings::FocusConfigStore;
pub use survey::{
    sky_grid, FocusSurvey, SkipReason, SkippedTarget, SurveyError, SurveyOutcome, SurveyResult,
    SurveyRow,
};

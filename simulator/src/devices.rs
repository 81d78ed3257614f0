//! Simulated focuser, camera and mount implementing the hardware traits.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hardware::{
    CameraInterface, Exposure, FocuserInterface, HardwareError, HardwareResult, MountInterface,
    SensorSize, Subframe,
};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{rng, Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};
use shared::Coordinate;

use crate::focus_model::{SimulationConfig, SimulationError, VCurveModel};

/// Focuser position shared between the simulated focuser and camera.
#[derive(Debug, Clone, Default)]
pub struct FocuserPosition(Arc<AtomicI32>);

impl FocuserPosition {
    pub fn new(position: i32) -> Self {
        Self(Arc::new(AtomicI32::new(position)))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, position: i32) {
        self.0.store(position, Ordering::SeqCst);
    }
}

/// Focuser that travels a fixed number of steps per motion poll.
#[derive(Debug)]
pub struct SimulatedFocuser {
    position: FocuserPosition,
    target: i32,
    steps_per_poll: i32,
    min_position: i32,
    max_position: i32,
    moves: usize,
}

impl SimulatedFocuser {
    pub fn new(config: &SimulationConfig, start_position: i32) -> Self {
        Self {
            position: FocuserPosition::new(start_position),
            target: start_position,
            steps_per_poll: config.focuser_steps_per_poll.max(1),
            min_position: config.focuser_min,
            max_position: config.focuser_max,
            moves: 0,
        }
    }

    /// Handle for reading the focuser position from elsewhere (the camera).
    pub fn position_handle(&self) -> FocuserPosition {
        self.position.clone()
    }

    /// Number of accepted move commands.
    pub fn moves(&self) -> usize {
        self.moves
    }
}

impl FocuserInterface for SimulatedFocuser {
    fn move_to(&mut self, position: i32) -> HardwareResult<()> {
        if !(self.min_position..=self.max_position).contains(&position) {
            return Err(HardwareError::device(
                "focuser",
                format!(
                    "position {position} outside travel [{}, {}]",
                    self.min_position, self.max_position
                ),
            ));
        }
        self.target = position;
        self.moves += 1;
        Ok(())
    }

    fn is_moving(&mut self) -> HardwareResult<bool> {
        let current = self.position.get();
        if current == self.target {
            return Ok(false);
        }
        let remaining = self.target - current;
        let step = remaining.clamp(-self.steps_per_poll, self.steps_per_poll);
        self.position.set(current + step);
        trace!("Simulated focuser at {}", current + step);
        Ok(true)
    }

    fn position(&mut self) -> HardwareResult<i32> {
        Ok(self.position.get())
    }
}

/// Camera imaging one star whose size follows a [`VCurveModel`].
///
/// Each frame draws Gaussian FWHM noise and may drop out (no star reported).
/// The peak pixel scales with exposure time and falls off as the star
/// defocuses; it clips at the saturation level.
pub struct SimulatedCamera {
    config: SimulationConfig,
    focuser: FocuserPosition,
    noise: Normal<f64>,
    rng: StdRng,
    subframe: Subframe,
    exposures: usize,
}

impl SimulatedCamera {
    /// Create a camera reading focus from `focuser`; `rng_seed` makes frames reproducible.
    pub fn new(
        config: SimulationConfig,
        focuser: FocuserPosition,
        rng_seed: Option<u64>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let noise = Normal::new(0.0, config.fwhm_noise_px).map_err(|_| {
            SimulationError::InvalidParameter {
                name: "fwhm_noise_px",
                value: config.fwhm_noise_px,
            }
        })?;
        let rng_seed = rng_seed.unwrap_or_else(|| rng().next_u64());
        let subframe = SensorSize::new(config.sensor_width, config.sensor_height).full_frame();

        Ok(Self {
            config,
            focuser,
            noise,
            rng: StdRng::seed_from_u64(rng_seed),
            subframe,
            exposures: 0,
        })
    }

    pub fn model(&self) -> &VCurveModel {
        &self.config.model
    }

    /// Move the best-focus position, e.g. to mimic thermal drift between targets.
    pub fn set_best_position(&mut self, best_position: i32) {
        self.config.model.best_position = best_position;
    }

    pub fn subframe(&self) -> Subframe {
        self.subframe
    }

    /// Frames taken so far.
    pub fn exposures(&self) -> usize {
        self.exposures
    }
}

impl CameraInterface for SimulatedCamera {
    fn expose(&mut self, duration: Duration) -> HardwareResult<Exposure> {
        self.exposures += 1;
        let t = duration.as_secs_f64();
        let background = self.config.background_rate * t;
        let (star_x, star_y) = (self.config.star_x, self.config.star_y);

        if !self.subframe.contains(star_x, star_y) {
            debug!("Simulated star outside readout window");
            return Ok(Exposure {
                fwhm: None,
                peak_counts: background,
                peak_x: self.subframe.x,
                peak_y: self.subframe.y,
            });
        }

        let position = self.focuser.get();
        let model = &self.config.model;
        let star_peak = self.config.star_peak_rate * t * model.peak_fraction(position);
        let peak_counts = (background + star_peak).min(self.config.saturation_adu);

        let dropped = self.rng.random_bool(self.config.dropout_probability);
        let fwhm = if dropped || !model.detectable(position) {
            None
        } else {
            Some((model.fwhm(position) + self.noise.sample(&mut self.rng)).max(0.0))
        };
        trace!("Simulated frame at focus {position}: fwhm {fwhm:?}, peak {peak_counts:.0}");

        Ok(Exposure {
            fwhm,
            peak_counts,
            peak_x: star_x,
            peak_y: star_y,
        })
    }

    fn sensor_size(&self) -> SensorSize {
        SensorSize::new(self.config.sensor_width, self.config.sensor_height)
    }

    fn set_subframe(&mut self, frame: Subframe) -> HardwareResult<()> {
        let sensor = self.sensor_size();
        if frame.width == 0
            || frame.height == 0
            || frame.x + frame.width > sensor.width
            || frame.y + frame.height > sensor.height
        {
            return Err(HardwareError::device(
                "camera",
                format!("subframe {frame:?} does not fit the sensor"),
            ));
        }
        self.subframe = frame;
        Ok(())
    }
}

/// Build a focuser/camera pair sharing one focuser position.
pub fn simulated_devices(
    config: &SimulationConfig,
    start_position: i32,
    rng_seed: Option<u64>,
) -> Result<(SimulatedFocuser, SimulatedCamera), SimulationError> {
    let focuser = SimulatedFocuser::new(config, start_position);
    let camera = SimulatedCamera::new(config.clone(), focuser.position_handle(), rng_seed)?;
    Ok((focuser, camera))
}

/// Mount that records every slew; optionally fails on the n-th slew.
#[derive(Debug, Default)]
pub struct SimulatedMount {
    slews: Vec<Coordinate>,
    fail_on_slew: Option<usize>,
}

impl SimulatedMount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the slew with this zero-based index.
    pub fn failing_on(slew_index: usize) -> Self {
        Self {
            slews: Vec::new(),
            fail_on_slew: Some(slew_index),
        }
    }

    /// Targets slewed to, in order.
    pub fn slews(&self) -> &[Coordinate] {
        &self.slews
    }
}

impl MountInterface for SimulatedMount {
    fn slew_to(&mut self, target: Coordinate) -> HardwareResult<()> {
        if self.fail_on_slew == Some(self.slews.len()) {
            return Err(HardwareError::device(
                "mount",
                format!("slew to {target} aborted"),
            ));
        }
        debug!("Simulated slew to {target}");
        self.slews.push(target);
        Ok(())
    }
}

//! Equatorial sky coordinates used for catalog entries and pointing targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when constructing a coordinate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Declination {0} is outside [-90, 90] degrees")]
    DeclinationOutOfRange(f64),
    #[error("Coordinate component is not finite (ra={ra}, dec={dec})")]
    NotFinite { ra: f64, dec: f64 },
}

/// Right ascension / declination pair in degrees.
///
/// Right ascension is not normalized; callers wanting `[0, 360)` must wrap it
/// themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Right ascension in degrees
    pub ra: f64,
    /// Declination in degrees, within [-90, 90]
    pub dec: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite values and declinations past the poles.
    pub fn new(ra: f64, dec: f64) -> Result<Self, CoordinateError> {
        if !ra.is_finite() || !dec.is_finite() {
            return Err(CoordinateError::NotFinite { ra, dec });
        }
        if !(-90.0..=90.0).contains(&dec) {
            return Err(CoordinateError::DeclinationOutOfRange(dec));
        }
        Ok(Self { ra, dec })
    }

    /// Squared distance in the flat (RA, Dec) plane, in square degrees.
    ///
    /// This is not an angular separation: RA is not scaled by cos(dec) and
    /// the 0/360 wrap is not handled.
    pub fn planar_distance_sq(&self, other: &Coordinate) -> f64 {
        let d_ra = other.ra - self.ra;
        let d_dec = other.dec - self.dec;
        d_ra * d_ra + d_dec * d_dec
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:.6}, {:.6}}}", self.ra, self.dec)
    }
}

//! # Regatta Scoring & Tide Engine
//!
//! This library holds the two algorithmic pieces of the championship app: the
//! low-point series scoring rules and the harmonic tide model. Everything else in
//! the app (screens, venue tables, notifications) only calls into these.
//!
//! ## Scoring
//!
//! Race results are plain point values in race order. Non-finishes are scored as
//! ordinary integers (usually fleet size + 1), so the scoring functions never need
//! to know about penalty codes. See [`scoring`] for the discard table and the
//! consistency checks used to flag published totals that do not add up.
//!
//! ## Tides
//!
//! Heights come from a four-constituent harmonic sum (M2, S2, K1, O1) evaluated at
//! the station closest to the requested coordinate:
//!
//! ```text
//! height(t) = mean_level + Σ amplitude · cos(2π · t / period − phase)
//! ```
//!
//! Results are floored at zero and rounded to centimetres. When no station is
//! registered a time-of-day approximation is used instead and the resulting
//! forecast is marked offline.
//!
//! ### Data Flow
//! 1. **Startup**: regional constants (or `[[stations]]` from config) → optional live
//!    harmonic feed refresh → [`forecast::TideModel`]
//! 2. **Display**: [`service::TideService`] refreshes a per-station snapshot on a timer
//! 3. **Forecast**: 24 hourly [`TidePrediction`]s anchored at the request time
//! 4. **Guard**: [`forecast::TideModel::verify_data_consistency`] checks that the
//!    direct and hourly paths agree
//!
//! ## Core Types
//! - [`Coordinate`]: validated latitude/longitude pair
//! - [`Trend`]: rising/falling/stable with a 5 cm dead-band
//! - [`TidePrediction`]: one height sample with its trend
//! - [`HourlyForecast`]: 24 hourly samples plus an offline flag

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod config;
pub mod fallback;
pub mod forecast;
pub mod harmonic;
pub mod renderer;
pub mod results;
pub mod scoring;
pub mod service;
pub mod station;
pub mod tide_data;

/// Height change per hour (metres) below which the tide is reported as stable.
pub const TREND_DEADBAND_M: f64 = 0.05;

/// Maximum allowed difference (metres) between the direct and hourly height paths.
pub const CONSISTENCY_TOLERANCE_M: f64 = 0.10;

/// Number of samples in an hourly forecast.
pub const HOURLY_SAMPLES: usize = 24;

/// Errors raised when building a [`Coordinate`] from untrusted input.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate is not finite: ({latitude}, {longitude})")]
    NonFinite { latitude: f64, longitude: f64 },

    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
}

/// A point on the chart in decimal degrees.
///
/// Always finite and within range; construction goes through [`Coordinate::new`],
/// including when deserialized from config.
///
/// # Example
/// ```
/// use regatta_tide_lib::Coordinate;
///
/// let harbour = Coordinate::new(43.66, -70.25).unwrap();
/// assert_eq!(harbour.latitude(), 43.66);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite {
                latitude,
                longitude,
            });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Straight-line distance in raw degrees.
    ///
    /// Not a geodesic distance; it is only used to pick the closest of a handful
    /// of nearby stations, where the approximation is good enough.
    pub fn degree_distance(&self, other: &Coordinate) -> f64 {
        (self.latitude - other.latitude).hypot(self.longitude - other.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Direction the water is moving over the next hour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    /// Classify a one-hour height change, ignoring moves inside the dead-band.
    ///
    /// ```
    /// use regatta_tide_lib::Trend;
    ///
    /// assert_eq!(Trend::from_velocity(0.12), Trend::Rising);
    /// assert_eq!(Trend::from_velocity(-0.12), Trend::Falling);
    /// assert_eq!(Trend::from_velocity(0.03), Trend::Stable);
    /// ```
    pub fn from_velocity(velocity_m_per_h: f64) -> Self {
        if velocity_m_per_h > TREND_DEADBAND_M {
            Trend::Rising
        } else if velocity_m_per_h < -TREND_DEADBAND_M {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }

    /// Classify from the height now and the height one hour later.
    pub fn from_heights(now_m: f64, next_hour_m: f64) -> Self {
        Self::from_velocity(next_hour_m - now_m)
    }

    pub fn symbol(&self) -> char {
        match self {
            Trend::Rising => '↑',
            Trend::Falling => '↓',
            Trend::Stable => '→',
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        };
        f.write_str(label)
    }
}

/// A single tide height at an absolute instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TidePrediction {
    pub time: DateTime<Utc>,
    /// Height in metres, floored at zero and rounded to centimetres
    pub height_m: f64,
    pub trend: Trend,
    /// Height one hour later minus height now
    pub velocity_m_per_h: f64,
}

/// Twenty-four hourly predictions anchored at the time the forecast was requested.
///
/// # Offline Behavior
/// When `offline = true` no station was available and the samples come from the
/// location-independent fallback in [`fallback`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HourlyForecast {
    /// Station the forecast was computed for, `None` for the fallback model
    pub station_id: Option<String>,
    pub samples: Vec<TidePrediction>,
    pub offline: bool,
}

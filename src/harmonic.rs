//! # Harmonic Tide Synthesis
//!
//! Tide height as a sum of cosine terms, one per constituent:
//!
//! ```text
//! height(t) = mean_level + Σ amplitude(c) · cos(2π · t / period(c) − phase(c))
//! ```
//!
//! `t` is seconds since the Unix epoch. Phases are stored in degrees (as
//! published) and converted to radians here. Only the four largest constituents
//! are modelled, which is enough for a course-side estimate:
//!
//! | constituent | description | period |
//! |---|---|---|
//! | M2 | principal lunar semi-diurnal | 12.4206 h |
//! | S2 | principal solar semi-diurnal | 12.0000 h |
//! | K1 | lunar diurnal | 23.9345 h |
//! | O1 | lunar diurnal | 25.8193 h |
//!
//! Nothing in this module performs I/O, so synthesis cannot fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

/// A named periodic term of the tide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constituent {
    M2,
    S2,
    K1,
    O1,
}

impl Constituent {
    pub const ALL: [Constituent; 4] = [
        Constituent::M2,
        Constituent::S2,
        Constituent::K1,
        Constituent::O1,
    ];

    pub fn period_hours(self) -> f64 {
        match self {
            Constituent::M2 => 12.420_601_2,
            Constituent::S2 => 12.0,
            Constituent::K1 => 23.934_469_6,
            Constituent::O1 => 25.819_341_7,
        }
    }

    pub fn period_seconds(self) -> f64 {
        self.period_hours() * 3600.0
    }

    pub fn name(self) -> &'static str {
        match self {
            Constituent::M2 => "M2",
            Constituent::S2 => "S2",
            Constituent::K1 => "K1",
            Constituent::O1 => "O1",
        }
    }

    /// Look up a constituent by its conventional name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Constituent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Amplitude and phase of one constituent at a station.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarmonicConstant {
    pub constituent: Constituent,
    /// Metres
    pub amplitude_m: f64,
    /// Degrees
    pub phase_deg: f64,
}

impl HarmonicConstant {
    pub fn new(constituent: Constituent, amplitude_m: f64, phase_deg: f64) -> Self {
        Self {
            constituent,
            amplitude_m,
            phase_deg,
        }
    }

    /// This constituent's contribution to the height at `t_seconds`.
    ///
    /// Exactly periodic in the constituent's own period.
    pub fn contribution(&self, t_seconds: f64) -> f64 {
        let angle =
            TAU * t_seconds / self.constituent.period_seconds() - self.phase_deg.to_radians();
        self.amplitude_m * angle.cos()
    }
}

/// Unrounded, unclamped harmonic sum.
pub fn synthesize(mean_level_m: f64, constants: &[HarmonicConstant], t_seconds: f64) -> f64 {
    mean_level_m
        + constants
            .iter()
            .map(|constant| constant.contribution(t_seconds))
            .sum::<f64>()
}

/// Seconds since the Unix epoch, with millisecond resolution.
pub fn epoch_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Round to centimetres.
pub fn round_cm(value_m: f64) -> f64 {
    (value_m * 100.0).round() / 100.0
}

/// Clamp a raw height at zero and round it to centimetres.
pub fn round_height(raw_m: f64) -> f64 {
    round_cm(raw_m.max(0.0))
}

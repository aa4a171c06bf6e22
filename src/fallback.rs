//! # Fallback Tide Model
//!
//! Location-independent approximation used when no station is registered. It is
//! a single semidiurnal sine wave driven only by the UTC time of day:
//!
//! - **Period**: 12.42 hours (half a lunar day)
//! - **Mean level**: 1.5 m above chart datum
//! - **Amplitude**: 1.2 m
//!
//! ### Accuracy Trade-offs
//! - ✅ **Correct period**: matches the semidiurnal cycle
//! - ❌ **No constituents**: no spring–neap envelope, no diurnal inequality
//! - ❌ **No location**: the same curve everywhere
//!
//! Forecasts built from this model are marked offline so the app can flag them.
//!
//! ## Jitter
//! The app used to add a little noise to fallback heights so the marker did not
//! look frozen. That is now opt-in through [`Jitter`], which owns a seedable RNG;
//! the deterministic functions here never jitter.

use crate::harmonic::{round_cm, round_height};
use crate::{HourlyForecast, TidePrediction, Trend, HOURLY_SAMPLES};
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

const PERIOD_HRS: f64 = 12.42;
const MEAN_LEVEL_M: f64 = 1.5;
const AMPLITUDE_M: f64 = 1.2;

/// Fallback height in metres at `time`, using only the time of day.
pub fn approximate_height(time: DateTime<Utc>) -> f64 {
    let hours_of_day = f64::from(time.num_seconds_from_midnight()) / 3600.0;
    round_height(MEAN_LEVEL_M + AMPLITUDE_M * (TAU * hours_of_day / PERIOD_HRS).cos())
}

/// Fallback prediction with trend, mirroring the harmonic path.
pub fn approximate_prediction(time: DateTime<Utc>) -> TidePrediction {
    let height_m = approximate_height(time);
    let velocity_m_per_h = round_cm(approximate_height(time + Duration::hours(1)) - height_m);
    TidePrediction {
        time,
        height_m,
        trend: Trend::from_velocity(velocity_m_per_h),
        velocity_m_per_h,
    }
}

/// Generate an offline hourly forecast starting at `start`.
/// If `start` is `None`, fall back to `Utc::now()`.
pub fn approximate(start: Option<DateTime<Utc>>) -> HourlyForecast {
    let start = start.unwrap_or_else(Utc::now);
    let mut samples = Vec::with_capacity(HOURLY_SAMPLES);
    for hour in 0..HOURLY_SAMPLES as i64 {
        samples.push(approximate_prediction(start + Duration::hours(hour)));
    }

    HourlyForecast {
        station_id: None,
        samples,
        offline: true,
    }
}

/// Cosmetic noise for displayed fallback heights.
#[derive(Debug)]
pub struct Jitter {
    rng: StdRng,
    max_m: f64,
}

impl Jitter {
    /// Reproducible jitter of up to ±`max_m` metres.
    pub fn seeded(seed: u64, max_m: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_m: jitter_bound(max_m),
        }
    }

    /// Jitter seeded from OS entropy.
    pub fn from_entropy(max_m: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            max_m: jitter_bound(max_m),
        }
    }

    pub fn max_m(&self) -> f64 {
        self.max_m
    }

    /// Perturb `height_m` and re-apply the zero floor and rounding.
    pub fn apply(&mut self, height_m: f64) -> f64 {
        if self.max_m == 0.0 {
            return height_m;
        }
        round_height(height_m + self.rng.gen_range(-self.max_m..=self.max_m))
    }
}

/// Non-finite bounds disable jitter.
fn jitter_bound(max_m: f64) -> f64 {
    if max_m.is_finite() {
        max_m.abs()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_approximate_changes_with_time() {
        let t0 = Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap();
        let h0 = approximate_height(t0);
        let h_half_period = approximate_height(t0 + Duration::minutes(373));

        // 6h13m is about half a period: close to the opposite extreme.
        assert!(
            (h0 - h_half_period).abs() > 2.0,
            "Tide should swing after half a period ({h0} vs {h_half_period})"
        );
    }

    #[test]
    fn test_only_time_of_day_matters() {
        let monday = Utc.with_ymd_and_hms(2025, 7, 21, 9, 15, 0).unwrap();
        let friday = Utc.with_ymd_and_hms(2025, 7, 25, 9, 15, 0).unwrap();
        assert_eq!(approximate_height(monday), approximate_height(friday));
    }

    #[test]
    fn test_range_stays_positive() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for minutes in (0..1440).step_by(10) {
            let height = approximate_height(start + Duration::minutes(minutes));
            assert!((0.29..=2.71).contains(&height), "height {height} out of range");
        }
    }

    #[test]
    fn test_approximate_series_shape() {
        let start = Utc.with_ymd_and_hms(2025, 7, 24, 5, 0, 0).unwrap();
        let series = approximate(Some(start));
        assert!(series.offline);
        assert!(series.station_id.is_none());
        assert_eq!(series.samples.len(), HOURLY_SAMPLES);
        assert_eq!(series.samples[0].time, start);
        assert_eq!(series.samples[23].time, start + Duration::hours(23));
    }

    #[test]
    fn test_seeded_jitter_is_reproducible_and_bounded() {
        let mut a = Jitter::seeded(7, 0.05);
        let mut b = Jitter::seeded(7, 0.05);
        for _ in 0..50 {
            let ja = a.apply(1.0);
            assert_eq!(ja, b.apply(1.0));
            assert!((0.95..=1.05).contains(&ja));
        }
    }

    #[test]
    fn test_zero_jitter_is_identity() {
        let mut jitter = Jitter::seeded(1, 0.0);
        assert_eq!(jitter.apply(1.23), 1.23);
    }

    #[test]
    fn test_non_finite_jitter_is_disabled() {
        for bound in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut jitter = Jitter::seeded(1, bound);
            assert_eq!(jitter.max_m(), 0.0);
            assert_eq!(jitter.apply(1.23), 1.23);
            assert_eq!(Jitter::from_entropy(bound).apply(0.5), 0.5);
        }
        assert_eq!(Jitter::seeded(1, -0.05).max_m(), 0.05);
    }
}

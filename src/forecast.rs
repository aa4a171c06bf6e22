//! # Tide Model
//!
//! Turns a set of stations into heights for any coordinate and instant, and
//! derives the quantities the map marker and forecast panel display: the trend
//! over the next hour and a 24-hour hourly series.
//!
//! Both panels must show the same number for the same instant. They do by
//! construction because every path funnels into [`TideModel::height`];
//! [`TideModel::verify_data_consistency`] is the regression guard that keeps it
//! that way.

use crate::fallback;
use crate::harmonic::round_cm;
use crate::station::{self, TideStation};
use crate::{
    Coordinate, HourlyForecast, TidePrediction, Trend, CONSISTENCY_TOLERANCE_M, HOURLY_SAMPLES,
};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Harmonic tide model over a fixed set of stations.
#[derive(Clone, Debug, Default)]
pub struct TideModel {
    stations: Vec<TideStation>,
}

/// Result of comparing the direct and hourly-series height paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub coordinate: Coordinate,
    pub time: DateTime<Utc>,
    pub station_id: Option<String>,
    pub direct_height_m: f64,
    /// `None` if no hourly sample matched the hour of `time`
    pub hourly_height_m: Option<f64>,
    pub difference_m: Option<f64>,
    pub is_consistent: bool,
}

impl TideModel {
    pub fn new(stations: Vec<TideStation>) -> Self {
        Self { stations }
    }

    pub fn stations(&self) -> &[TideStation] {
        &self.stations
    }

    pub fn station(&self, id: &str) -> Option<&TideStation> {
        self.stations.iter().find(|station| station.id == id)
    }

    pub fn nearest_station(&self, coordinate: &Coordinate) -> Option<&TideStation> {
        station::nearest(&self.stations, coordinate)
    }

    /// Height in metres at `coordinate` and `time`.
    ///
    /// Uses the nearest station's harmonics, or the time-of-day fallback when no
    /// station is registered.
    pub fn height(&self, coordinate: &Coordinate, time: DateTime<Utc>) -> f64 {
        match self.nearest_station(coordinate) {
            Some(station) => station.height_at(time),
            None => fallback::approximate_height(time),
        }
    }

    /// Height, velocity and trend at `coordinate` and `time`.
    pub fn predict(&self, coordinate: &Coordinate, time: DateTime<Utc>) -> TidePrediction {
        match self.nearest_station(coordinate) {
            Some(station) => self.predict_station(station, time),
            None => fallback::approximate_prediction(time),
        }
    }

    /// Height, velocity and trend for a specific station.
    pub fn predict_station(&self, station: &TideStation, time: DateTime<Utc>) -> TidePrediction {
        prediction_from(time, |t| station.height_at(t))
    }

    /// Twenty-four hourly predictions starting at `start`.
    pub fn hourly_predictions(
        &self,
        coordinate: &Coordinate,
        start: DateTime<Utc>,
    ) -> HourlyForecast {
        let Some(station) = self.nearest_station(coordinate) else {
            return fallback::approximate(Some(start));
        };

        let samples = (0..HOURLY_SAMPLES as i64)
            .map(|hour| self.predict_station(station, start + Duration::hours(hour)))
            .collect();

        HourlyForecast {
            station_id: Some(station.id.clone()),
            samples,
            offline: false,
        }
    }

    /// Compare the direct height with the hourly-series height for `time`.
    ///
    /// The hourly path builds the forecast the panel would show and picks the
    /// sample whose hour of day matches `time`.
    pub fn verify_data_consistency(
        &self,
        coordinate: &Coordinate,
        time: DateTime<Utc>,
    ) -> ConsistencyCheck {
        let direct_height_m = self.height(coordinate, time);
        let forecast = self.hourly_predictions(coordinate, time);
        let hourly_height_m = forecast
            .samples
            .iter()
            .find(|sample| sample.time.hour() == time.hour())
            .map(|sample| sample.height_m);

        let difference_m = hourly_height_m.map(|hourly| (direct_height_m - hourly).abs());
        let is_consistent = difference_m.is_some_and(|diff| diff < CONSISTENCY_TOLERANCE_M);

        debug!(
            %coordinate,
            direct = direct_height_m,
            hourly = ?hourly_height_m,
            is_consistent,
            "tide consistency check"
        );

        ConsistencyCheck {
            coordinate: *coordinate,
            time,
            station_id: forecast.station_id,
            direct_height_m,
            hourly_height_m,
            difference_m,
            is_consistent,
        }
    }
}

fn prediction_from(
    time: DateTime<Utc>,
    height: impl Fn(DateTime<Utc>) -> f64,
) -> TidePrediction {
    let height_m = height(time);
    let velocity_m_per_h = round_cm(height(time + Duration::hours(1)) - height_m);
    TidePrediction {
        time,
        height_m,
        trend: Trend::from_velocity(velocity_m_per_h),
        velocity_m_per_h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::regional_stations;
    use chrono::TimeZone;

    fn harbour() -> Coordinate {
        Coordinate::new(43.65, -70.25).unwrap()
    }

    #[test]
    fn test_hourly_series_has_24_samples_anchored_at_start() {
        let model = TideModel::new(regional_stations());
        let start = Utc.with_ymd_and_hms(2025, 7, 24, 10, 20, 0).unwrap();
        let forecast = model.hourly_predictions(&harbour(), start);

        assert_eq!(forecast.samples.len(), 24);
        assert!(!forecast.offline);
        assert_eq!(forecast.station_id.as_deref(), Some("8418150"));
        for (hour, sample) in forecast.samples.iter().enumerate() {
            assert_eq!(sample.time, start + Duration::hours(hour as i64));
            assert_eq!(sample.height_m, model.height(&harbour(), sample.time));
        }
    }

    #[test]
    fn test_prediction_trend_follows_velocity() {
        let model = TideModel::new(regional_stations());
        let start = Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap();
        for step in 0..48 {
            let prediction = model.predict(&harbour(), start + Duration::minutes(30 * step));
            assert_eq!(prediction.trend, Trend::from_velocity(prediction.velocity_m_per_h));
        }
    }

    #[test]
    fn test_trend_sees_both_directions_over_a_day() {
        let model = TideModel::new(regional_stations());
        let start = Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap();
        let trends: Vec<Trend> = model
            .hourly_predictions(&harbour(), start)
            .samples
            .iter()
            .map(|sample| sample.trend)
            .collect();
        assert!(trends.contains(&Trend::Rising));
        assert!(trends.contains(&Trend::Falling));
    }

    #[test]
    fn test_consistency_holds_through_both_paths() {
        let model = TideModel::new(regional_stations());
        let start = Utc.with_ymd_and_hms(2025, 7, 24, 0, 7, 13).unwrap();
        for step in 0..96 {
            let time = start + Duration::minutes(17 * step);
            let check = model.verify_data_consistency(&harbour(), time);
            assert!(check.is_consistent, "inconsistent at {time}");
            assert!(check.difference_m.unwrap() < CONSISTENCY_TOLERANCE_M);
        }
    }

    #[test]
    fn test_empty_registry_uses_fallback() {
        let model = TideModel::default();
        let time = Utc.with_ymd_and_hms(2025, 7, 24, 3, 0, 0).unwrap();

        assert!(model.nearest_station(&harbour()).is_none());
        assert_eq!(model.height(&harbour(), time), fallback::approximate_height(time));

        let forecast = model.hourly_predictions(&harbour(), time);
        assert!(forecast.offline);
        assert!(forecast.station_id.is_none());

        let check = model.verify_data_consistency(&harbour(), time);
        assert!(check.is_consistent);
        assert!(check.station_id.is_none());
    }

    #[test]
    fn test_station_lookup_by_id() {
        let model = TideModel::new(regional_stations());
        assert_eq!(model.station("8443970").unwrap().name, "Boston, MA");
        assert!(model.station("0000000").is_none());
    }
}

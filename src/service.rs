//! # Tide Service
//!
//! Owns the tide model plus a per-station "current height" snapshot that a
//! background task refreshes on a fixed interval. The app builds one service at
//! startup and calls [`TideService::start`] / [`TideService::stop`] explicitly;
//! nothing is polled from a constructor.
//!
//! Reads of the snapshot are not synchronised with the timer, so a displayed
//! height can be up to one refresh interval old. An older snapshot (the timer
//! was stopped, or never started) is ignored and the height is recomputed.
//! Consistency checks never read the snapshot; they go straight to the model.

use crate::fallback::{self, Jitter};
use crate::forecast::{ConsistencyCheck, TideModel};
use crate::{Coordinate, HourlyForecast, TidePrediction};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Latest computed state of one station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub station_id: String,
    pub station_name: String,
    pub prediction: TidePrediction,
    pub refreshed_at: DateTime<Utc>,
}

impl StationSnapshot {
    /// Whether this snapshot may still be shown at `now`.
    fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        (now - self.refreshed_at)
            .to_std()
            .is_ok_and(|age| age <= max_age)
    }
}

/// Shortest refresh period; `tokio::time::interval` rejects zero.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

type SnapshotMap = Arc<RwLock<HashMap<String, StationSnapshot>>>;

/// Tide model with a timer-refreshed snapshot cache.
pub struct TideService {
    model: Arc<TideModel>,
    snapshots: SnapshotMap,
    refresh_interval: Duration,
    jitter: Option<Arc<Mutex<Jitter>>>,
    task: Option<JoinHandle<()>>,
}

impl TideService {
    /// Intervals shorter than one second are raised to one second.
    pub fn new(model: TideModel, refresh_interval: Duration) -> Self {
        Self {
            model: Arc::new(model),
            snapshots: Arc::new(RwLock::new(HashMap::new())),
            refresh_interval: refresh_interval.max(MIN_REFRESH_INTERVAL),
            jitter: None,
            task: None,
        }
    }

    /// Add cosmetic jitter to fallback heights returned by [`Self::current`].
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = Some(Arc::new(Mutex::new(jitter)));
        self
    }

    pub fn model(&self) -> &TideModel {
        &self.model
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Start the refresh timer. No-op if it is already running.
    ///
    /// Must be called from within a tokio runtime; otherwise a warning is
    /// logged and the service keeps serving computed heights.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("tide refresh already running");
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(error) => {
                warn!(%error, "no tokio runtime, tide refresh not started");
                return;
            }
        };

        let model = Arc::clone(&self.model);
        let snapshots = Arc::clone(&self.snapshots);
        let period = self.refresh_interval;

        self.task = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                refresh_snapshots(&model, &snapshots, Utc::now());
            }
        }));
        info!(interval_secs = period.as_secs(), "tide refresh started");
    }

    /// Stop the refresh timer. No-op if it is not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("tide refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Recompute every station snapshot for `now`.
    pub fn refresh_at(&self, now: DateTime<Utc>) {
        refresh_snapshots(&self.model, &self.snapshots, now);
    }

    pub fn snapshot(&self, station_id: &str) -> Option<StationSnapshot> {
        self.snapshots.read().get(station_id).cloned()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.read().len()
    }

    /// Displayed tide state at `coordinate`.
    ///
    /// Uses the nearest station's snapshot when it is at most one refresh
    /// interval old, computes the height otherwise, and falls back to the
    /// time-of-day model (with jitter, if configured) when there are no stations.
    pub fn current(&self, coordinate: &Coordinate, now: DateTime<Utc>) -> TidePrediction {
        if let Some(station) = self.model.nearest_station(coordinate) {
            return match self.snapshot(&station.id) {
                Some(snapshot) if snapshot.is_fresh(now, self.refresh_interval) => {
                    snapshot.prediction
                }
                _ => self.model.predict_station(station, now),
            };
        }

        let mut prediction = fallback::approximate_prediction(now);
        if let Some(jitter) = &self.jitter {
            prediction.height_m = jitter.lock().apply(prediction.height_m);
        }
        prediction
    }

    pub fn current_height(&self, coordinate: &Coordinate, now: DateTime<Utc>) -> f64 {
        self.current(coordinate, now).height_m
    }

    pub fn hourly_predictions(
        &self,
        coordinate: &Coordinate,
        start: DateTime<Utc>,
    ) -> HourlyForecast {
        self.model.hourly_predictions(coordinate, start)
    }

    pub fn verify_data_consistency(
        &self,
        coordinate: &Coordinate,
        time: DateTime<Utc>,
    ) -> ConsistencyCheck {
        self.model.verify_data_consistency(coordinate, time)
    }
}

impl Drop for TideService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn refresh_snapshots(model: &TideModel, snapshots: &SnapshotMap, now: DateTime<Utc>) {
    let fresh: HashMap<String, StationSnapshot> = model
        .stations()
        .iter()
        .map(|station| {
            let snapshot = StationSnapshot {
                station_id: station.id.clone(),
                station_name: station.name.clone(),
                prediction: model.predict_station(station, now),
                refreshed_at: now,
            };
            (station.id.clone(), snapshot)
        })
        .collect();

    debug!(stations = fresh.len(), "tide snapshots refreshed");
    *snapshots.write() = fresh;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::regional_stations;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn harbour() -> Coordinate {
        Coordinate::new(43.65, -70.25).unwrap()
    }

    fn service() -> TideService {
        TideService::new(TideModel::new(regional_stations()), Duration::from_secs(60))
    }

    #[test]
    fn test_refresh_fills_every_station() {
        let service = service();
        assert_eq!(service.snapshot_count(), 0);

        let now = Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap();
        service.refresh_at(now);

        assert_eq!(service.snapshot_count(), 2);
        let snapshot = service.snapshot("8418150").unwrap();
        assert_eq!(snapshot.refreshed_at, now);
        assert_eq!(snapshot.prediction.height_m, service.model().height(&harbour(), now));
    }

    #[test]
    fn test_current_reads_snapshot_until_next_refresh() {
        let service = service();
        let refreshed = Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap();
        service.refresh_at(refreshed);

        // Thirty seconds later the display still shows the refreshed snapshot.
        let later = refreshed + ChronoDuration::seconds(30);
        let current = service.current(&harbour(), later);
        assert_eq!(current.time, refreshed);

        service.refresh_at(later);
        assert_eq!(service.current(&harbour(), later).time, later);
    }

    #[test]
    fn test_current_ignores_snapshot_older_than_interval() {
        let service = service();
        let refreshed = Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap();
        service.refresh_at(refreshed);

        // Exactly one interval old is still shown.
        let edge = refreshed + ChronoDuration::seconds(60);
        assert_eq!(service.current(&harbour(), edge).time, refreshed);

        // The timer is not running; six hours later the height is recomputed.
        let later = refreshed + ChronoDuration::hours(6);
        let current = service.current(&harbour(), later);
        assert_eq!(current.time, later);
        assert_eq!(current.height_m, service.model().height(&harbour(), later));

        // A snapshot from the future is not shown either.
        let earlier = refreshed - ChronoDuration::minutes(5);
        assert_eq!(service.current(&harbour(), earlier).time, earlier);
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let service = TideService::new(TideModel::default(), Duration::ZERO);
        assert_eq!(service.refresh_interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_start_with_zero_interval_keeps_running() {
        let mut service = TideService::new(TideModel::new(regional_stations()), Duration::ZERO);
        service.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(service.is_running());
        assert_eq!(service.snapshot_count(), 2);
        service.stop();
    }

    #[test]
    fn test_current_computes_before_first_refresh() {
        let service = service();
        let now = Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap();
        assert_eq!(
            service.current_height(&harbour(), now),
            service.model().height(&harbour(), now)
        );
    }

    #[test]
    fn test_fallback_jitter_is_seedable() {
        let now = Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap();
        let a = TideService::new(TideModel::default(), Duration::from_secs(60))
            .with_jitter(Jitter::seeded(3, 0.05));
        let b = TideService::new(TideModel::default(), Duration::from_secs(60))
            .with_jitter(Jitter::seeded(3, 0.05));

        let base = fallback::approximate_height(now);
        for _ in 0..10 {
            let ha = a.current_height(&harbour(), now);
            assert_eq!(ha, b.current_height(&harbour(), now));
            assert!((ha - base).abs() <= 0.051);
        }

        // Consistency never sees the jitter.
        assert!(a.verify_data_consistency(&harbour(), now).is_consistent);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut service = service();
        service.stop();
        service.stop();
        assert!(!service.is_running());
    }

    #[test]
    fn test_start_without_runtime_does_not_panic() {
        let mut service = service();
        service.start();
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_refreshes() {
        let mut service = service();
        service.start();
        assert!(service.is_running());
        service.start();
        assert!(service.is_running());

        // The interval ticks immediately on start.
        for _ in 0..50 {
            if service.snapshot_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(service.snapshot_count(), 2);

        service.stop();
        assert!(!service.is_running());
        service.stop();
    }
}

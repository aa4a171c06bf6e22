//! # Harmonic Constants Feed and Caching
//!
//! Refreshes station constituents from NOAA's CO-OPS metadata API at startup.
//! The harmonic model works without it; the feed only replaces the regional
//! constants with the station's published values when they can be obtained.
//!
//! ## Data Source
//! - **URL**: `{base_url}/{station_id}/harcon.json?units=metric`
//! - **Format**: JSON with a `HarmonicConstituents` array (name, amplitude, phase_GMT)
//! - **Used**: M2, S2, K1 and O1 only; the other constituents are ignored
//!
//! ## Caching Strategy
//! - **Location**: one JSON file per station under `feed.cache_dir`
//! - **TTL**: `feed.cache_ttl_minutes`, checked against the file modification time
//! - **Writes**: best effort; a failed cache write never fails the fetch
//!
//! ## Error Handling
//! Every failure mode maps to [`TideError`]. [`discover_stations`] absorbs them:
//! it logs a warning and keeps the regional constants, so nothing here can stop
//! the tide model from answering.

use crate::config::{Config, FeedConfig};
use crate::harmonic::{Constituent, HarmonicConstant};
use crate::station::TideStation;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use std::{fs, io};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while fetching or caching harmonic constants.
#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response or cache body was not the expected JSON
    #[error("parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Station published none of the modelled constituents
    #[error("station {0} has no M2/S2/K1/O1 constituents")]
    MissingConstituents(String),

    /// Cache file operations failed (permissions, disk space, staleness)
    #[error("cache IO: {0}")]
    Cache(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct HarconResponse {
    #[serde(rename = "HarmonicConstituents")]
    harmonic_constituents: Vec<HarconEntry>,
}

#[derive(Debug, Deserialize)]
struct HarconEntry {
    name: String,
    amplitude: f64,
    #[serde(rename = "phase_GMT")]
    phase_gmt: f64,
}

/// Parse a `harcon.json` body, keeping the modelled constituents.
pub fn parse_harcon(station_id: &str, body: &str) -> Result<Vec<HarmonicConstant>, TideError> {
    let response: HarconResponse = serde_json::from_str(body)?;

    let constants: Vec<HarmonicConstant> = response
        .harmonic_constituents
        .into_iter()
        .filter_map(|entry| {
            let constituent = Constituent::from_name(&entry.name)?;
            Some(HarmonicConstant::new(
                constituent,
                entry.amplitude,
                entry.phase_gmt,
            ))
        })
        .collect();

    if constants.is_empty() {
        return Err(TideError::MissingConstituents(station_id.to_string()));
    }
    Ok(constants)
}

/// Client for the harmonic constants endpoint.
pub struct HarmonicFeed {
    client: reqwest::Client,
    base_url: String,
    cache_dir: PathBuf,
    ttl: Duration,
}

impl HarmonicFeed {
    pub fn new(config: &FeedConfig) -> Result<Self, TideError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache_dir: config.cache_dir.clone(),
            ttl: config.cache_ttl(),
        })
    }

    /// Constituents for `station_id`, from cache when fresh, else from the network.
    pub async fn fetch(&self, station_id: &str) -> Result<Vec<HarmonicConstant>, TideError> {
        let cache_path = self.cache_path(station_id);

        if let Ok(constants) = load_cache(&cache_path, self.ttl) {
            debug!(station = station_id, "harmonic constants served from cache");
            return Ok(constants);
        }

        let constants = self.fetch_remote(station_id).await?;

        if let Err(error) = save_cache(&cache_path, &constants) {
            debug!(station = station_id, %error, "could not write harmonic cache");
        }

        Ok(constants)
    }

    async fn fetch_remote(&self, station_id: &str) -> Result<Vec<HarmonicConstant>, TideError> {
        let url = format!("{}/{}/harcon.json?units=metric", self.base_url, station_id);
        debug!(%url, "fetching harmonic constants");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_harcon(station_id, &body)
    }

    fn cache_path(&self, station_id: &str) -> PathBuf {
        self.cache_dir.join(format!("harcon_{station_id}.json"))
    }
}

/// Stations for the model, refreshed from the live feed where possible.
///
/// Never fails: any feed error is logged and the station keeps the
/// constituents it started with.
pub async fn discover_stations(config: &Config) -> Vec<TideStation> {
    let stations = config.stations();
    if !config.feed.enabled {
        return stations;
    }

    let feed = match HarmonicFeed::new(&config.feed) {
        Ok(feed) => feed,
        Err(error) => {
            warn!(%error, "harmonic feed unavailable, using configured constants");
            return stations;
        }
    };

    let mut refreshed = Vec::with_capacity(stations.len());
    for mut station in stations {
        match feed.fetch(&station.id).await {
            Ok(constants) => {
                info!(
                    station = %station.id,
                    constituents = constants.len(),
                    "harmonic constants refreshed"
                );
                station.constituents = constants;
            }
            Err(error) => {
                warn!(
                    station = %station.id,
                    %error,
                    "harmonic fetch failed, keeping regional constants"
                );
            }
        }
        refreshed.push(station);
    }
    refreshed
}

// -- Private Implementation --

/// Load cached constants if the file is younger than `ttl`.
fn load_cache(path: &Path, ttl: Duration) -> Result<Vec<HarmonicConstant>, TideError> {
    let meta = fs::metadata(path)?;

    let age = SystemTime::now()
        .duration_since(meta.modified()?)
        .map_err(|_| io::Error::other("cache modified in the future"))?;

    if age > ttl {
        return Err(io::Error::other("stale").into());
    }

    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Save constants to the cache file. Failure is non-fatal for callers.
fn save_cache(path: &Path, constants: &[HarmonicConstant]) -> Result<(), TideError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_vec(constants)?)?;
    Ok(())
}

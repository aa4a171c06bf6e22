//! # Regatta Tide Application Entry Point
//!
//! Command-line front end for the scoring and tide engine.
//!
//! ```text
//! regatta-tide tide [LAT LON]     current height, 24h chart and consistency check
//! regatta-tide watch [LAT LON]    keep the refresh timer running and print each update
//! regatta-tide score RESULTS.json validate published totals and print standings
//! ```
//!
//! Without a coordinate the first configured station is used. Logging goes to
//! stderr and is filtered by `RUST_LOG` directives (default `info`).

#[cfg(test)]
mod tests;

use anyhow::{bail, Context};
use chrono::Utc;
use regatta_tide_lib::config::Config;
use regatta_tide_lib::forecast::TideModel;
use regatta_tide_lib::renderer::{
    draw_ascii, render_consistency, render_prediction, render_standings,
    render_validation_failures,
};
use regatta_tide_lib::results::ResultsSheet;
use regatta_tide_lib::scoring::{series_standings, validate_championship_scoring};
use regatta_tide_lib::service::TideService;
use regatta_tide_lib::{tide_data, Coordinate};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "info";

const USAGE: &str = "usage: regatta-tide [tide|watch [LAT LON] | score RESULTS.json]";

/// Log filter from `RUST_LOG`-style directives, `info` when unset or invalid.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Parse an optional `LAT LON` pair from the remaining arguments.
fn parse_coordinate(args: &[String]) -> anyhow::Result<Option<Coordinate>> {
    match args {
        [] => Ok(None),
        [lat, lon] => {
            let latitude: f64 = lat.parse().with_context(|| format!("bad latitude {lat:?}"))?;
            let longitude: f64 = lon.parse().with_context(|| format!("bad longitude {lon:?}"))?;
            Ok(Some(Coordinate::new(latitude, longitude)?))
        }
        _ => bail!("{USAGE}"),
    }
}

/// Query coordinate: the one given, else the first station.
fn query_coordinate(
    requested: Option<Coordinate>,
    model: &TideModel,
) -> anyhow::Result<Coordinate> {
    requested
        .or_else(|| model.stations().first().map(|station| station.location))
        .context("no coordinate given and no stations configured")
}

async fn build_service(config: &Config) -> TideService {
    let stations = tide_data::discover_stations(config).await;
    let service = TideService::new(TideModel::new(stations), config.refresh_interval());
    match config.jitter() {
        Some(jitter) => service.with_jitter(jitter),
        None => service,
    }
}

fn run_tide(config: &Config, requested: Option<Coordinate>) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let service = rt.block_on(build_service(config));

    let now = Utc::now();
    service.refresh_at(now);
    let coordinate = query_coordinate(requested, service.model())?;

    let station = service
        .model()
        .nearest_station(&coordinate)
        .map(|station| format!("{} ({})", station.name, station.id))
        .unwrap_or_else(|| "no station".to_string());
    println!("{} at {}", station, coordinate);
    println!("{}", render_prediction(&service.current(&coordinate, now)));
    println!();

    draw_ascii(&service.hourly_predictions(&coordinate, now));
    println!();

    let check = service.verify_data_consistency(&coordinate, now);
    if !check.is_consistent {
        warn!(%coordinate, "tide display paths disagree");
    }
    println!("{}", render_consistency(&check));
    Ok(())
}

fn run_watch(config: &Config, requested: Option<Coordinate>) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut service = build_service(config).await;
        let coordinate = query_coordinate(requested, service.model())?;
        service.start();

        let mut ticker = tokio::time::interval(service.refresh_interval());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    let prediction = service.current(&coordinate, now);
                    println!("{}  {}", now.format("%H:%M:%S"), render_prediction(&prediction));
                }
                result = tokio::signal::ctrl_c() => {
                    result.context("waiting for ctrl-c")?;
                    break;
                }
            }
        }

        service.stop();
        Ok(())
    })
}

fn run_score(config: &Config, path: &str) -> anyhow::Result<()> {
    let sheet = ResultsSheet::load(path)?;
    info!(
        path,
        competitors = sheet.competitors.len(),
        fleet_size = sheet.fleet_size(),
        "results sheet loaded"
    );

    let failures = validate_championship_scoring(&sheet.competitor_scores()?);
    print!("{}", render_validation_failures(&failures));
    println!();

    let policy = sheet.discard_policy_or(config.scoring.discard_policy);
    let standings = series_standings(&sheet.series_entries()?, policy);
    print!("{}", render_standings(&standings));

    if !failures.is_empty() {
        warn!(failures = failures.len(), "published totals need correcting");
    }
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(log_filter(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::load();

    match args.split_first() {
        None => run_tide(&config, None),
        Some((command, rest)) => match command.as_str() {
            "tide" => run_tide(&config, parse_coordinate(rest)?),
            "watch" => run_watch(&config, parse_coordinate(rest)?),
            "score" => match rest {
                [path] => run_score(&config, path),
                _ => bail!("{USAGE}"),
            },
            "-h" | "--help" => {
                println!("{USAGE}");
                Ok(())
            }
            other => bail!("unknown command {other:?}\n{USAGE}"),
        },
    }
}

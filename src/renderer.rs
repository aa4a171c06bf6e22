//! # Terminal Rendering
//!
//! ASCII output for the command-line tool: the 24-hour tide chart, series
//! standings and the list of published totals that failed validation. Every
//! renderer builds a `String` so it can be tested; the `draw_*` helpers print it.

use crate::forecast::ConsistencyCheck;
use crate::scoring::{CompetitorValidation, SeriesStanding};
use crate::{HourlyForecast, TidePrediction};
use std::fmt::Write;

const ROWS: usize = 16;
const Y_AXIS_WIDTH: usize = 6;

/// Format a height in metres for axis labels and tables.
fn format_height(height_m: f64) -> String {
    if height_m.fract() == 0.0 {
        format!("{:.0}m", height_m)
    } else {
        format!("{:.1}m", height_m)
    }
}

/// (min, max) heights across the samples, widened when the series is flat.
fn calculate_display_bounds(samples: &[TidePrediction]) -> (f64, f64) {
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), sample| {
            (min.min(sample.height_m), max.max(sample.height_m))
        });

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max - min < f64::EPSILON {
        return ((min - 0.5).max(0.0), max + 0.5);
    }
    (min, max)
}

/// Render the hourly forecast as an ASCII chart. The first column is "now".
pub fn render_forecast(forecast: &HourlyForecast) -> String {
    let mut out = String::new();
    let samples = &forecast.samples;
    if samples.is_empty() {
        out.push_str("(no tide samples)\n");
        return out;
    }

    let (min_height, max_height) = calculate_display_bounds(samples);
    let height_to_row = |height_m: f64| {
        let normalized = (height_m - min_height) / (max_height - min_height);
        let row = ((1.0 - normalized) * (ROWS as f64 - 1.0)).round();
        (row.max(0.0) as usize).min(ROWS - 1)
    };

    let mut grid = vec![vec![' '; samples.len() + Y_AXIS_WIDTH]; ROWS];

    let range = max_height - min_height;
    let step = if range > 2.0 {
        0.5
    } else if range > 0.8 {
        0.25
    } else {
        0.1
    };
    let mut label_height = (min_height / step).ceil() * step;
    while label_height <= max_height + 1e-9 {
        let row = height_to_row(label_height);
        let label = format!(
            "{:<width$}",
            format_height(label_height),
            width = Y_AXIS_WIDTH - 1
        );
        for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
            grid[row][i] = ch;
        }
        grid[row][Y_AXIS_WIDTH - 1] = '│';
        label_height += step;
    }

    for (column, sample) in samples.iter().enumerate() {
        let row = height_to_row(sample.height_m);
        grid[row][column + Y_AXIS_WIDTH] = if column == 0 { 'X' } else { '•' };
    }

    match (&forecast.station_id, forecast.offline) {
        (_, true) => out.push_str("⚠ OFFLINE (time-of-day estimate)\n\n"),
        (Some(station), false) => {
            let _ = writeln!(out, "Station {}\n", station);
        }
        (None, false) => {}
    }

    for row in grid {
        out.extend(row);
        out.push('\n');
    }

    let padding = " ".repeat(Y_AXIS_WIDTH);
    let markers: String = (0..samples.len())
        .map(|i| if i % 6 == 0 { '|' } else { ' ' })
        .collect();
    let _ = writeln!(out, "{}{}", padding, markers);

    let right_width = samples.len().saturating_sub(3);
    let _ = writeln!(
        out,
        "{}Now{:>width$}",
        padding,
        format!("+{}h", samples.len() - 1),
        width = right_width
    );
    out
}

/// Print the hourly forecast chart to the terminal.
pub fn draw_ascii(forecast: &HourlyForecast) {
    print!("{}", render_forecast(forecast));
}

/// One-line summary of a prediction, e.g. `1.84m ↑ rising (+0.21 m/h)`.
pub fn render_prediction(prediction: &TidePrediction) -> String {
    format!(
        "{:.2}m {} {} ({:+.2} m/h)",
        prediction.height_m,
        prediction.trend.symbol(),
        prediction.trend,
        prediction.velocity_m_per_h
    )
}

pub fn render_consistency(check: &ConsistencyCheck) -> String {
    match (check.hourly_height_m, check.difference_m) {
        (Some(hourly), Some(difference)) => format!(
            "consistency: {} (direct {:.2}m, hourly {:.2}m, diff {:.2}m)",
            if check.is_consistent { "ok" } else { "MISMATCH" },
            check.direct_height_m,
            hourly,
            difference
        ),
        _ => format!(
            "consistency: MISMATCH (direct {:.2}m, no hourly sample)",
            check.direct_height_m
        ),
    }
}

/// Standings table, best first. Discarded races are listed 1-based.
pub fn render_standings(standings: &[SeriesStanding]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<12} {:>6} {:>6}  discarded",
        "rank", "sail", "total", "net"
    );
    for standing in standings {
        let discarded = standing
            .discarded_races
            .iter()
            .map(|index| format!("R{}", index + 1))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            "{:>4}  {:<12} {:>6} {:>6}  {}",
            standing.rank,
            standing.sail_number,
            standing.total_points,
            standing.net_points,
            discarded
        );
    }
    out
}

/// Validation failures, or a single line when every total checks out.
pub fn render_validation_failures(failures: &[CompetitorValidation]) -> String {
    if failures.is_empty() {
        return "All published totals match race points.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} published total(s) do not add up:", failures.len());
    for failure in failures {
        let message = failure.validation.message.as_deref().unwrap_or("invalid");
        let _ = writeln!(out, "  {:<12} {}", failure.sail_number, message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::validate_scoring_consistency;
    use crate::Trend;
    use chrono::{Duration, TimeZone, Utc};

    fn test_forecast(heights: &[f64]) -> HourlyForecast {
        let start = Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap();
        HourlyForecast {
            station_id: Some("8418150".to_string()),
            samples: heights
                .iter()
                .enumerate()
                .map(|(hour, &height_m)| TidePrediction {
                    time: start + Duration::hours(hour as i64),
                    height_m,
                    trend: Trend::Stable,
                    velocity_m_per_h: 0.0,
                })
                .collect(),
            offline: false,
        }
    }

    #[test]
    fn test_format_height() {
        assert_eq!(format_height(2.0), "2m");
        assert_eq!(format_height(1.3), "1.3m");
        assert_eq!(format_height(0.0), "0m");
    }

    #[test]
    fn test_display_bounds() {
        let forecast = test_forecast(&[1.0, 2.0, 3.0, 2.0]);
        assert_eq!(calculate_display_bounds(&forecast.samples), (1.0, 3.0));

        let flat = test_forecast(&[1.0, 1.0]);
        assert_eq!(calculate_display_bounds(&flat.samples), (0.5, 1.5));
        assert_eq!(calculate_display_bounds(&[]), (0.0, 1.0));
    }

    #[test]
    fn test_forecast_chart_marks_now() {
        let heights: Vec<f64> = (0..24).map(|h| 1.5 + (h as f64 / 4.0).sin()).collect();
        let chart = render_forecast(&test_forecast(&heights));

        assert!(chart.starts_with("Station 8418150"));
        assert_eq!(chart.matches('X').count(), 1);
        assert_eq!(chart.matches('•').count(), 23);
        assert!(chart.contains("Now"));
        assert!(chart.contains("+23h"));
        assert!(!chart.contains("OFFLINE"));
    }

    #[test]
    fn test_offline_indicator() {
        let mut forecast = test_forecast(&[1.0, 1.2, 1.1]);
        forecast.offline = true;
        forecast.station_id = None;
        assert!(render_forecast(&forecast).starts_with("⚠ OFFLINE"));
    }

    #[test]
    fn test_flat_forecast_does_not_panic() {
        let chart = render_forecast(&test_forecast(&[0.0; 24]));
        assert_eq!(chart.matches('X').count(), 1);
        draw_ascii(&test_forecast(&[0.0; 24]));
    }

    #[test]
    fn test_standings_table() {
        let standings = vec![SeriesStanding {
            rank: 1,
            sail_number: "GBR 1234".to_string(),
            total_points: 18,
            net_points: 13,
            discarded_races: vec![3],
        }];
        let table = render_standings(&standings);
        assert!(table.lines().next().unwrap().contains("rank"));
        assert!(table.contains("GBR 1234"));
        assert!(table.contains("R4"));
    }

    #[test]
    fn test_validation_report() {
        assert!(render_validation_failures(&[]).starts_with("All published totals"));

        let failures = vec![CompetitorValidation {
            sail_number: "AUS 99".to_string(),
            validation: validate_scoring_consistency(&[2, 2, 6, 1], &[6], 7),
        }];
        let report = render_validation_failures(&failures);
        assert!(report.contains("AUS 99"));
        assert!(report.contains("off by 2"));
    }

    #[test]
    fn test_prediction_line() {
        let prediction = TidePrediction {
            time: Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap(),
            height_m: 1.84,
            trend: Trend::Rising,
            velocity_m_per_h: 0.21,
        };
        assert_eq!(render_prediction(&prediction), "1.84m ↑ rising (+0.21 m/h)");
    }
}

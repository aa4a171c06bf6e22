//! # Results Sheet Ingestion
//!
//! Reads the championship results export (JSON) into the plain point sequences
//! the scoring functions take. Race entries may be numbers or scoring codes:
//!
//! ```json
//! {
//!   "fleetSize": 15,
//!   "discardPolicy": "standard",
//!   "competitors": [
//!     { "sailNumber": "GBR 1234", "raceResults": [1, 3, "DNF", 2],
//!       "discards": ["DNF"], "totalPoints": 6 }
//!   ]
//! }
//! ```
//!
//! Codes score as fleet size + 1. The fleet size defaults to the number of
//! competitors on the sheet.

use crate::scoring::{
    CompetitorScores, DiscardPolicy, PenaltyCode, PenaltyCodeError, RacePoints, SeriesEntry,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A single race cell: points, or a scoring code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RaceEntry {
    Points(RacePoints),
    Code(String),
}

impl RaceEntry {
    pub fn points(&self, fleet_size: u32) -> Result<RacePoints, PenaltyCodeError> {
        match self {
            RaceEntry::Points(points) => Ok(*points),
            RaceEntry::Code(code) => Ok(code.parse::<PenaltyCode>()?.points(fleet_size)),
        }
    }
}

/// One competitor line as published.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSheet {
    pub sail_number: String,
    pub race_results: Vec<RaceEntry>,
    #[serde(default)]
    pub discards: Vec<RaceEntry>,
    pub total_points: i64,
}

/// A full results export.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSheet {
    #[serde(default)]
    pub fleet_size: Option<u32>,
    #[serde(default)]
    pub discard_policy: Option<DiscardPolicy>,
    pub competitors: Vec<CompetitorSheet>,
}

impl ResultsSheet {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("results sheet is not valid JSON")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading results sheet {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn fleet_size(&self) -> u32 {
        self.fleet_size
            .unwrap_or_else(|| u32::try_from(self.competitors.len()).unwrap_or(u32::MAX))
    }

    /// Sheet policy, or `default` when the sheet does not specify one.
    pub fn discard_policy_or(&self, default: DiscardPolicy) -> DiscardPolicy {
        self.discard_policy.unwrap_or(default)
    }

    /// Published lines with codes resolved to points.
    pub fn competitor_scores(&self) -> anyhow::Result<Vec<CompetitorScores>> {
        let fleet_size = self.fleet_size();
        self.competitors
            .iter()
            .map(|competitor| {
                Ok(CompetitorScores {
                    sail_number: competitor.sail_number.clone(),
                    race_results: resolve(&competitor.race_results, fleet_size)
                        .with_context(|| format!("race results for {}", competitor.sail_number))?,
                    discards: resolve(&competitor.discards, fleet_size)
                        .with_context(|| format!("discards for {}", competitor.sail_number))?,
                    total_points: competitor.total_points,
                })
            })
            .collect()
    }

    /// Race-by-race points for building standings.
    pub fn series_entries(&self) -> anyhow::Result<Vec<SeriesEntry>> {
        Ok(self
            .competitor_scores()?
            .into_iter()
            .map(|scores| SeriesEntry {
                sail_number: scores.sail_number,
                race_results: scores.race_results,
            })
            .collect())
    }
}

fn resolve(entries: &[RaceEntry], fleet_size: u32) -> Result<Vec<RacePoints>, PenaltyCodeError> {
    entries.iter().map(|entry| entry.points(fleet_size)).collect()
}

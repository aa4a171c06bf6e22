//! # Low-Point Series Scoring
//!
//! Implements the series arithmetic used for the championship results pages:
//! how many races a boat may discard, which results are discarded, the net
//! total that remains, and checks that published totals match the race-by-race
//! points.
//!
//! ## Discard Table
//!
//! | races sailed | discards |
//! |---|---|
//! | 0–3 | 0 |
//! | 4–9 | 1 |
//! | 10–12 | 2 |
//! | 13+ | races / 5 |
//!
//! The 13+ branch is kept exactly as the championship's sailing instructions
//! publish it, even though most federation tables step more finely.
//!
//! ## Value Semantics
//!
//! Discards are point values, not race positions. Two 5-point races with one
//! discard remove a single 5 from the total; which of the two races is shown as
//! discarded is only decided by [`discard_race_indices`] (the later race).
//!
//! Every function here is pure: no I/O and no shared state, so results are
//! reproducible from the arguments alone.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Points scored in one race. Lower is better.
pub type RacePoints = u32;

/// Number of discards allowed for `total_races` completed races.
///
/// # Example
/// ```
/// use regatta_tide_lib::scoring::calculate_discard_count;
///
/// assert_eq!(calculate_discard_count(3), 0);
/// assert_eq!(calculate_discard_count(4), 1);
/// assert_eq!(calculate_discard_count(10), 2);
/// assert_eq!(calculate_discard_count(15), 3);
/// ```
pub fn calculate_discard_count(total_races: usize) -> usize {
    match total_races {
        0..=3 => 0,
        4..=9 => 1,
        10..=12 => 2,
        races => races / 5,
    }
}

/// The `discard_count` worst (highest) results, worst first.
///
/// Returns every result when `discard_count` covers the whole series, and an
/// empty list when there is nothing to discard.
///
/// # Example
/// ```
/// use regatta_tide_lib::scoring::find_discards;
///
/// assert_eq!(find_discards(&[1, 3, 2, 5, 2, 1, 4], 1), vec![5]);
/// assert_eq!(find_discards(&[1, 2, 3, 4, 5, 6], 2), vec![6, 5]);
/// ```
pub fn find_discards(race_results: &[RacePoints], discard_count: usize) -> Vec<RacePoints> {
    if discard_count == 0 || race_results.is_empty() {
        return Vec::new();
    }

    let mut worst_first = race_results.to_vec();
    worst_first.sort_unstable_by(|a, b| b.cmp(a));
    worst_first.truncate(discard_count);
    worst_first
}

/// Race indices to show as discarded, worst first.
///
/// When several races carry the same points the later race is discarded first,
/// so a boat with two DNFs keeps the earlier one counted. The points at these
/// indices always match [`find_discards`] as a multiset.
pub fn discard_race_indices(race_results: &[RacePoints], discard_count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..race_results.len()).collect();
    order.sort_by(|&a, &b| {
        race_results[b]
            .cmp(&race_results[a])
            .then_with(|| b.cmp(&a))
    });
    order.truncate(discard_count);
    order
}

/// Series total after removing `discard_count` worst results.
///
/// Equivalent to summing the `len - discard_count` best results. Empty input
/// scores 0.
pub fn calculate_net_points(race_results: &[RacePoints], discard_count: usize) -> i64 {
    sum_points(race_results) - sum_points(&find_discards(race_results, discard_count))
}

fn sum_points(points: &[RacePoints]) -> i64 {
    points.iter().map(|&p| i64::from(p)).sum()
}

/// Outcome of checking a published total against race points and discards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringValidation {
    pub is_valid: bool,
    /// Sum of race results minus sum of the supplied discards
    pub calculated: i64,
    pub expected: i64,
    /// Absolute difference between `calculated` and `expected`
    pub difference: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Check that `expected_total` equals race points minus the given discards.
///
/// The discards are taken as supplied; they are not re-derived from a discard
/// policy, so this only checks the arithmetic of an already published line.
/// A competitor with no race results is always reported invalid, even when the
/// claimed total is 0.
pub fn validate_scoring_consistency(
    race_results: &[RacePoints],
    discards: &[RacePoints],
    expected_total: i64,
) -> ScoringValidation {
    if race_results.is_empty() {
        return ScoringValidation {
            is_valid: false,
            calculated: 0,
            expected: expected_total,
            difference: expected_total.abs(),
            message: Some("No race results available to validate".to_string()),
        };
    }

    let calculated = sum_points(race_results) - sum_points(discards);
    let difference = (calculated - expected_total).abs();
    let is_valid = difference == 0;

    ScoringValidation {
        is_valid,
        calculated,
        expected: expected_total,
        difference,
        message: (!is_valid).then(|| {
            format!(
                "Calculated {} points but total shows {} (off by {})",
                calculated, expected_total, difference
            )
        }),
    }
}

/// One competitor's published series line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorScores {
    pub sail_number: String,
    pub race_results: Vec<RacePoints>,
    pub discards: Vec<RacePoints>,
    pub total_points: i64,
}

/// A competitor whose published total failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorValidation {
    pub sail_number: String,
    pub validation: ScoringValidation,
}

/// Validate every competitor and return only the failures, in input order.
pub fn validate_championship_scoring(
    competitors: &[CompetitorScores],
) -> Vec<CompetitorValidation> {
    competitors
        .iter()
        .filter_map(|competitor| {
            let validation = validate_scoring_consistency(
                &competitor.race_results,
                &competitor.discards,
                competitor.total_points,
            );
            (!validation.is_valid).then(|| CompetitorValidation {
                sail_number: competitor.sail_number.clone(),
                validation,
            })
        })
        .collect()
}

/// How many results a series allows a boat to drop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardPolicy {
    /// The championship table in [`calculate_discard_count`]
    #[default]
    Standard,
    /// Every race counts
    NoDiscards,
    /// A fixed number of discards, capped at the number of races sailed
    Fixed(usize),
}

impl DiscardPolicy {
    pub fn discard_count(&self, total_races: usize) -> usize {
        match *self {
            DiscardPolicy::Standard => calculate_discard_count(total_races),
            DiscardPolicy::NoDiscards => 0,
            DiscardPolicy::Fixed(count) => count.min(total_races),
        }
    }
}

/// Errors raised when a results sheet contains an unknown scoring code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PenaltyCodeError {
    #[error("unknown scoring code: {0}")]
    Unknown(String),
}

/// Scoring abbreviations that score as one more than the fleet size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PenaltyCode {
    /// Did not come to the starting area
    Dnc,
    /// Did not start
    Dns,
    /// On course side at the start
    Ocs,
    /// U flag disqualification
    Ufd,
    /// Black flag disqualification
    Bfd,
    /// Did not sail the course
    Nsc,
    /// Did not finish
    Dnf,
    /// Retired
    Ret,
    /// Disqualified
    Dsq,
    /// Non-excludable disqualification
    Dne,
}

impl PenaltyCode {
    pub const ALL: [PenaltyCode; 10] = [
        PenaltyCode::Dnc,
        PenaltyCode::Dns,
        PenaltyCode::Ocs,
        PenaltyCode::Ufd,
        PenaltyCode::Bfd,
        PenaltyCode::Nsc,
        PenaltyCode::Dnf,
        PenaltyCode::Ret,
        PenaltyCode::Dsq,
        PenaltyCode::Dne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PenaltyCode::Dnc => "DNC",
            PenaltyCode::Dns => "DNS",
            PenaltyCode::Ocs => "OCS",
            PenaltyCode::Ufd => "UFD",
            PenaltyCode::Bfd => "BFD",
            PenaltyCode::Nsc => "NSC",
            PenaltyCode::Dnf => "DNF",
            PenaltyCode::Ret => "RET",
            PenaltyCode::Dsq => "DSQ",
            PenaltyCode::Dne => "DNE",
        }
    }

    /// Points for this code in a fleet of `fleet_size` entries.
    pub fn points(&self, fleet_size: u32) -> RacePoints {
        fleet_size.saturating_add(1)
    }
}

impl fmt::Display for PenaltyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PenaltyCode {
    type Err = PenaltyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        PenaltyCode::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(code))
            .ok_or_else(|| PenaltyCodeError::Unknown(code.to_string()))
    }
}

/// A boat's race-by-race points, used to build standings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEntry {
    pub sail_number: String,
    pub race_results: Vec<RacePoints>,
}

/// A boat's place in the series after discards and tie-breaks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStanding {
    /// 1-based; boats that remain tied after every tie-break share a rank
    pub rank: usize,
    pub sail_number: String,
    pub total_points: i64,
    pub net_points: i64,
    /// Race indices (0-based) excluded from the net total, worst first
    pub discarded_races: Vec<usize>,
}

struct ScoredEntry<'a> {
    entry: &'a SeriesEntry,
    total_points: i64,
    net_points: i64,
    discarded_races: Vec<usize>,
    /// Kept results sorted best to worst
    kept_sorted: Vec<RacePoints>,
}

impl<'a> ScoredEntry<'a> {
    fn score(entry: &'a SeriesEntry, policy: DiscardPolicy) -> Self {
        let results = &entry.race_results;
        let discarded_races = discard_race_indices(results, policy.discard_count(results.len()));

        let mut kept_sorted: Vec<RacePoints> = results
            .iter()
            .enumerate()
            .filter(|(index, _)| !discarded_races.contains(index))
            .map(|(_, &points)| points)
            .collect();
        kept_sorted.sort_unstable();

        Self {
            entry,
            total_points: sum_points(results),
            net_points: sum_points(&kept_sorted),
            discarded_races,
            kept_sorted,
        }
    }
}

/// Low-point ordering with the usual series tie-breaks.
///
/// Ties on net points are broken by listing each boat's counted scores best to
/// worst and taking the first difference. If that does not separate them, the
/// last race decides, then the race before it, and so on, discards included.
fn compare_scored(a: &ScoredEntry<'_>, b: &ScoredEntry<'_>) -> Ordering {
    a.net_points
        .cmp(&b.net_points)
        .then_with(|| a.kept_sorted.cmp(&b.kept_sorted))
        .then_with(|| {
            a.entry
                .race_results
                .iter()
                .rev()
                .cmp(b.entry.race_results.iter().rev())
        })
}

/// Rank every entry under `policy`, best first.
pub fn series_standings(entries: &[SeriesEntry], policy: DiscardPolicy) -> Vec<SeriesStanding> {
    let mut scored: Vec<ScoredEntry<'_>> = entries
        .iter()
        .map(|entry| ScoredEntry::score(entry, policy))
        .collect();
    scored.sort_by(compare_scored);

    let mut standings: Vec<SeriesStanding> = Vec::with_capacity(scored.len());
    for (position, current) in scored.iter().enumerate() {
        let rank = match position.checked_sub(1).map(|prev| &scored[prev]) {
            Some(previous) if compare_scored(previous, current) == Ordering::Equal => {
                standings[position - 1].rank
            }
            _ => position + 1,
        };

        standings.push(SeriesStanding {
            rank,
            sail_number: current.entry.sail_number.clone(),
            total_points: current.total_points,
            net_points: current.net_points,
            discarded_races: current.discarded_races.clone(),
        });
    }

    standings
}

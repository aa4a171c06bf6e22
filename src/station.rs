//! # Tide Stations
//!
//! A station pins a set of harmonic constants to a place on the chart. Out of
//! the box the registry holds two NOAA reference harbours in the Gulf of Maine
//! (Portland, ME and Boston, MA). They are defaults, not the venue: a regatta
//! elsewhere lists its own stations under `[[stations]]` in the config file,
//! and the live feed in [`crate::tide_data`] can refresh their constituents at
//! startup.

use crate::harmonic::{
    epoch_seconds, round_height, synthesize, Constituent, HarmonicConstant,
};
use crate::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A harmonic tide station. Read-only once the model is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideStation {
    /// NOAA station id, also used as the snapshot key
    pub id: String,
    pub name: String,
    /// Mean tide level above chart datum, metres
    pub mean_level_m: f64,
    pub location: Coordinate,
    pub constituents: Vec<HarmonicConstant>,
}

impl TideStation {
    /// Raw harmonic sum at `t_seconds`, before clamping and rounding.
    pub fn raw_height(&self, t_seconds: f64) -> f64 {
        synthesize(self.mean_level_m, &self.constituents, t_seconds)
    }

    /// Height in metres at `time`, floored at zero, to the centimetre.
    pub fn height_at(&self, time: DateTime<Utc>) -> f64 {
        round_height(self.raw_height(epoch_seconds(time)))
    }
}

/// Closest station by straight-line distance in degrees.
pub fn nearest<'a>(stations: &'a [TideStation], query: &Coordinate) -> Option<&'a TideStation> {
    stations.iter().min_by(|a, b| {
        a.location
            .degree_distance(query)
            .total_cmp(&b.location.degree_distance(query))
    })
}

fn station(
    id: &str,
    name: &str,
    latitude: f64,
    longitude: f64,
    mean_level_m: f64,
    constants: [(Constituent, f64, f64); 4],
) -> TideStation {
    TideStation {
        id: id.to_string(),
        name: name.to_string(),
        mean_level_m,
        location: Coordinate {
            latitude,
            longitude,
        },
        constituents: constants
            .into_iter()
            .map(|(constituent, amplitude_m, phase_deg)| {
                HarmonicConstant::new(constituent, amplitude_m, phase_deg)
            })
            .collect(),
    }
}

/// Default Gulf of Maine reference stations, used when the config lists none.
pub fn regional_stations() -> Vec<TideStation> {
    vec![
        station(
            "8418150",
            "Portland, ME",
            43.6567,
            -70.2467,
            1.49,
            [
                (Constituent::M2, 1.37, 103.9),
                (Constituent::S2, 0.21, 142.7),
                (Constituent::K1, 0.14, 198.4),
                (Constituent::O1, 0.11, 185.1),
            ],
        ),
        station(
            "8443970",
            "Boston, MA",
            42.3539,
            -71.0503,
            1.57,
            [
                (Constituent::M2, 1.37, 110.7),
                (Constituent::S2, 0.21, 149.5),
                (Constituent::K1, 0.14, 201.6),
                (Constituent::O1, 0.11, 187.0),
            ],
        ),
    ]
}

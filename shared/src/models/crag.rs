//! Crag catalog models

use serde::{Deserialize, Serialize};

/// A climbing crag entry from a precomputed distance dataset.
///
/// Catalog entries are produced offline by the distance fetcher and are
/// read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Crag {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Driving distance from the origin city, in kilometres.
    #[serde(rename = "distance")]
    pub distance_km: f64,
    /// Number of documented climbs at this crag.
    #[serde(default)]
    pub climbs: i64,
}

impl Crag {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, distance_km: f64, climbs: i64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            distance_km,
            climbs,
        }
    }
}

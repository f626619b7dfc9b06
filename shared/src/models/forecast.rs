//! Forecast models shared between the discovery and alert paths

use serde::{Deserialize, Serialize};

/// Normalized forecast for one location and calendar date.
///
/// `temperature` is whole degrees Celsius, rounded up. `conditions` is the
/// provider's primary weather description, kept verbatim; comparisons
/// case-fold it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForecastSnapshot {
    pub temperature: i32,
    pub conditions: String,
}

impl ForecastSnapshot {
    pub fn new(temperature: i32, conditions: impl Into<String>) -> Self {
        Self {
            temperature,
            conditions: conditions.into(),
        }
    }
}

/// One date-keyed entry of a discovery forecast annotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayForecast {
    pub temperature: i32,
    pub description: String,
    pub icon: String,
}

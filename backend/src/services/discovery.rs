//! Crag discovery: distance-filtered catalog lookup with live forecasts
//!
//! Read-only. Filters the static catalog for an origin by precomputed
//! driving distance and annotates survivors with a date-keyed forecast
//! mapping. A temperature band only ever filters single-day requests.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared::{validate_temperature_band, DayForecast};

use crate::error::{AppError, AppResult};
use crate::external::weather::WeatherClient;
use crate::services::catalog::CatalogStore;

/// Assumed average travel speed: catalog distance units covered per hour
/// of the travel-time budget. Not a live routing query.
pub const DISTANCE_UNITS_PER_HOUR: f64 = 100.0;

/// Discovery service for finding crags within a travel-time budget
#[derive(Clone)]
pub struct DiscoveryService {
    catalog: CatalogStore,
    weather: WeatherClient,
}

/// Find-crags request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindCragsRequest {
    pub hours: Option<f64>,
    pub origin: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_temp: Option<i32>,
    pub max_temp: Option<i32>,
}

/// Validated discovery parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FindParams {
    pub hours: f64,
    pub origin: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Inclusive temperature band; present only when both bounds were
    /// supplied.
    pub band: Option<(i32, i32)>,
}

impl FindCragsRequest {
    /// Validate required fields and produce the discovery parameters.
    /// `hours`, `origin`, `date_from` and `date_to` must all be present
    /// and non-empty.
    pub fn into_params(self) -> AppResult<FindParams> {
        let hours = match self.hours {
            Some(hours) if hours > 0.0 => hours,
            _ => {
                return Err(AppError::Validation {
                    field: "hours".to_string(),
                    message: "hours is required and must be positive".to_string(),
                })
            }
        };

        let origin = match self.origin {
            Some(origin) if !origin.trim().is_empty() => origin,
            _ => {
                return Err(AppError::Validation {
                    field: "origin".to_string(),
                    message: "origin is required".to_string(),
                })
            }
        };

        let date_from = self.date_from.ok_or_else(|| AppError::Validation {
            field: "dateFrom".to_string(),
            message: "dateFrom is required".to_string(),
        })?;

        let date_to = self.date_to.ok_or_else(|| AppError::Validation {
            field: "dateTo".to_string(),
            message: "dateTo is required".to_string(),
        })?;

        let band = match (self.min_temp, self.max_temp) {
            (Some(min_temp), Some(max_temp)) => {
                validate_temperature_band(min_temp, max_temp).map_err(|message| {
                    AppError::Validation {
                        field: "minTemp".to_string(),
                        message: message.to_string(),
                    }
                })?;
                Some((min_temp, max_temp))
            }
            _ => None,
        };

        Ok(FindParams {
            hours,
            origin,
            date_from,
            date_to,
            band,
        })
    }
}

/// A crag surviving the filters, annotated with live forecasts
#[derive(Debug, Clone, Serialize)]
pub struct CragMatch {
    pub name: String,
    pub distance: f64,
    pub climbs: i64,
    pub lat: f64,
    pub lon: f64,
    pub weather: BTreeMap<NaiveDate, DayForecast>,
}

impl DiscoveryService {
    /// Create a new DiscoveryService instance
    pub fn new(catalog: CatalogStore, weather: WeatherClient) -> Self {
        Self { catalog, weather }
    }

    /// Find crags for the request, preserving catalog order.
    ///
    /// A forecast failure for one crag degrades to an empty weather map
    /// for that crag; it never fails the whole request.
    pub async fn find(&self, request: FindCragsRequest) -> AppResult<Vec<CragMatch>> {
        let params = request.into_params()?;
        let max_distance = max_distance_km(params.hours);
        let crags = filter_by_distance(self.catalog.load_for_origin(&params.origin)?, max_distance);
        let band = active_band(params.date_from, params.date_to, params.band);

        let mut matches = Vec::new();
        for crag in crags {
            let weather = match self
                .weather
                .forecast_range(crag.lat, crag.lon, params.date_from, params.date_to)
                .await
            {
                Ok(by_date) => by_date,
                Err(e) => {
                    tracing::warn!("Forecast fetch failed for {}: {}", crag.name, e);
                    BTreeMap::new()
                }
            };

            if let Some((min_temp, max_temp)) = band {
                if !passes_temperature_filter(&weather, params.date_from, min_temp, max_temp) {
                    continue;
                }
            }

            matches.push(CragMatch {
                name: crag.name,
                distance: crag.distance_km,
                climbs: crag.climbs,
                lat: crag.lat,
                lon: crag.lon,
                weather,
            });
        }

        Ok(matches)
    }
}

/// Maximum reachable distance for a travel-time budget
pub fn max_distance_km(hours: f64) -> f64 {
    hours * DISTANCE_UNITS_PER_HOUR
}

/// Inclusive distance cut-off
pub fn within_distance(distance_km: f64, max_distance_km: f64) -> bool {
    distance_km <= max_distance_km
}

/// Keep catalog entries within the distance cut-off, preserving order
pub fn filter_by_distance(crags: Vec<shared::Crag>, max_distance_km: f64) -> Vec<shared::Crag> {
    crags
        .into_iter()
        .filter(|crag| within_distance(crag.distance_km, max_distance_km))
        .collect()
}

/// The temperature band to apply, if any. The band only ever applies to
/// single-day requests; multi-day requests never filter by temperature
/// even when both bounds were supplied.
pub fn active_band(
    date_from: NaiveDate,
    date_to: NaiveDate,
    band: Option<(i32, i32)>,
) -> Option<(i32, i32)> {
    if date_from == date_to {
        band
    } else {
        None
    }
}

/// Single-day temperature filter: the day's temperature must fall within
/// the inclusive band. A missing forecast for the day excludes the crag
/// since the check cannot succeed on absent data.
pub fn passes_temperature_filter(
    weather: &BTreeMap<NaiveDate, DayForecast>,
    day: NaiveDate,
    min_temp: i32,
    max_temp: i32,
) -> bool {
    match weather.get(&day) {
        Some(forecast) => forecast.temperature >= min_temp && forecast.temperature <= max_temp,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn weather_for(day: &str, temperature: i32) -> BTreeMap<NaiveDate, DayForecast> {
        let mut by_date = BTreeMap::new();
        by_date.insert(
            date(day),
            DayForecast {
                temperature,
                description: "clear sky".to_string(),
                icon: String::new(),
            },
        );
        by_date
    }

    #[test]
    fn test_max_distance_from_hours() {
        assert_eq!(max_distance_km(2.0), 200.0);
        assert_eq!(max_distance_km(0.5), 50.0);
    }

    #[test]
    fn test_distance_boundary_is_inclusive() {
        let max = max_distance_km(2.0);
        assert!(within_distance(200.0, max));
        assert!(!within_distance(201.0, max));
    }

    #[test]
    fn test_temperature_filter_inclusive_bounds() {
        let weather = weather_for("2024-06-01", 15);
        assert!(passes_temperature_filter(&weather, date("2024-06-01"), 15, 20));
        assert!(passes_temperature_filter(&weather, date("2024-06-01"), 10, 15));
        assert!(!passes_temperature_filter(&weather, date("2024-06-01"), 16, 20));
    }

    #[test]
    fn test_temperature_filter_missing_day_excludes() {
        let weather = weather_for("2024-06-02", 15);
        assert!(!passes_temperature_filter(&weather, date("2024-06-01"), 10, 20));
    }

    #[test]
    fn test_into_params_requires_fields() {
        let request = FindCragsRequest {
            hours: Some(2.0),
            origin: Some("Montreal".to_string()),
            date_from: Some(date("2024-06-01")),
            date_to: Some(date("2024-06-05")),
            ..Default::default()
        };
        let params = request.into_params().unwrap();
        assert_eq!(params.origin, "Montreal");
        assert!(params.band.is_none());

        for broken in [
            FindCragsRequest {
                hours: None,
                origin: Some("Montreal".to_string()),
                date_from: Some(date("2024-06-01")),
                date_to: Some(date("2024-06-05")),
                ..Default::default()
            },
            FindCragsRequest {
                hours: Some(2.0),
                origin: Some("   ".to_string()),
                date_from: Some(date("2024-06-01")),
                date_to: Some(date("2024-06-05")),
                ..Default::default()
            },
            FindCragsRequest {
                hours: Some(2.0),
                origin: Some("Montreal".to_string()),
                date_from: None,
                date_to: Some(date("2024-06-05")),
                ..Default::default()
            },
        ] {
            assert!(broken.into_params().is_err());
        }
    }

    #[test]
    fn test_into_params_band_requires_both_bounds() {
        let request = FindCragsRequest {
            hours: Some(2.0),
            origin: Some("Montreal".to_string()),
            date_from: Some(date("2024-06-01")),
            date_to: Some(date("2024-06-01")),
            min_temp: Some(10),
            max_temp: None,
        };
        assert!(request.into_params().unwrap().band.is_none());
    }
}

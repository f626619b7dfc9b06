//! Weather API client for fetching forecast data
//!
//! Integrates with the OpenWeatherMap 5-day/3-hour forecast API. The
//! provider returns a rolling multi-day series of 3-hourly entries; the
//! alert path picks the first entry of a target date while the discovery
//! path folds the series into one entry per date, letting later slots of a
//! day overwrite earlier ones. Both behaviors are relied on by callers.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;

use shared::{DayForecast, ForecastSnapshot};

use crate::error::{AppError, AppResult};

/// Per-request timeout so a hung provider call cannot stall a scan pass.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// One normalized entry of the provider's forecast series.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub date: NaiveDate,
    pub temperature: i32,
    pub description: String,
    pub icon: String,
}

/// OpenWeatherMap API response for forecast
#[derive(Debug, Deserialize)]
struct OWMForecastResponse {
    list: Vec<OWMForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OWMForecastItem {
    dt: i64,
    main: OWMMain,
    weather: Vec<OWMWeather>,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OWMWeather {
    description: String,
    icon: String,
}

impl WeatherClient {
    /// Create a new WeatherClient against the production endpoint
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.openweathermap.org/data/2.5".to_string())
    }

    /// Create a new WeatherClient with custom base URL (for testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Fetch the rolling forecast series for a location.
    ///
    /// Provider failures (transport, non-success status, malformed body)
    /// all surface as `WeatherUnavailable`; batch callers treat that as
    /// "skip this item".
    pub async fn forecast_series(&self, lat: f64, lon: f64) -> AppResult<Vec<ForecastEntry>> {
        let url = format!(
            "{}/forecast?lat={}&lon={}&appid={}&units=metric",
            self.base_url, lat, lon, self.api_key
        );

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Weather API request failed: {}", e);
                AppError::WeatherUnavailable
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!("Weather API error: {}", status);
            return Err(AppError::WeatherUnavailable);
        }

        let data: OWMForecastResponse = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse forecast response: {}", e);
            AppError::WeatherUnavailable
        })?;

        Ok(convert_series(data))
    }

    /// Forecast for one location and calendar date, taken from the first
    /// matching series entry. `None` when the date is outside the
    /// provider's horizon.
    pub async fn forecast_for_date(
        &self,
        lat: f64,
        lon: f64,
        target_date: NaiveDate,
    ) -> AppResult<Option<ForecastSnapshot>> {
        let series = self.forecast_series(lat, lon).await?;
        Ok(snapshot_for_date(&series, target_date))
    }

    /// Date-keyed forecasts covering `[date_from, date_to]` inclusive.
    /// Dates outside the provider's horizon are absent from the map.
    pub async fn forecast_range(
        &self,
        lat: f64,
        lon: f64,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> AppResult<BTreeMap<NaiveDate, DayForecast>> {
        let series = self.forecast_series(lat, lon).await?;
        Ok(fold_range(&series, date_from, date_to))
    }
}

/// Convert the OpenWeatherMap series to normalized entries, in order
fn convert_series(data: OWMForecastResponse) -> Vec<ForecastEntry> {
    data.list
        .into_iter()
        .map(|item| {
            let weather = item.weather.first();
            ForecastEntry {
                date: DateTime::from_timestamp(item.dt, 0)
                    .unwrap_or_else(Utc::now)
                    .date_naive(),
                temperature: ceil_celsius(item.main.temp),
                description: weather.map(|w| w.description.clone()).unwrap_or_default(),
                icon: weather.map(|w| icon_url(&w.icon)).unwrap_or_default(),
            }
        })
        .collect()
}

/// First series entry whose date equals the target, as a snapshot
pub fn snapshot_for_date(series: &[ForecastEntry], target_date: NaiveDate) -> Option<ForecastSnapshot> {
    series
        .iter()
        .find(|entry| entry.date == target_date)
        .map(|entry| ForecastSnapshot::new(entry.temperature, entry.description.clone()))
}

/// Fold the series into one forecast per date within the window. Entries
/// are applied in series order, so the last slot of a day wins.
pub fn fold_range(
    series: &[ForecastEntry],
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> BTreeMap<NaiveDate, DayForecast> {
    let mut by_date = BTreeMap::new();
    for entry in series {
        if entry.date >= date_from && entry.date <= date_to {
            by_date.insert(
                entry.date,
                DayForecast {
                    temperature: entry.temperature,
                    description: entry.description.clone(),
                    icon: entry.icon.clone(),
                },
            );
        }
    }
    by_date
}

/// Round a raw temperature up to whole degrees Celsius. Rounding up (not
/// to nearest) biases estimates warm; the change predicate depends on it.
pub fn ceil_celsius(temp: f64) -> i32 {
    temp.ceil() as i32
}

/// Full icon URL for an OpenWeatherMap icon code
fn icon_url(code: &str) -> String {
    format!("http://openweathermap.org/img/wn/{}@2x.png", code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn entry(date_str: &str, temperature: i32, description: &str) -> ForecastEntry {
        ForecastEntry {
            date: date(date_str),
            temperature,
            description: description.to_string(),
            icon: icon_url("10d"),
        }
    }

    #[test]
    fn test_ceil_celsius_rounds_up() {
        assert_eq!(ceil_celsius(9.2), 10);
        assert_eq!(ceil_celsius(9.0), 9);
        assert_eq!(ceil_celsius(-0.5), 0);
        assert_eq!(ceil_celsius(-1.2), -1);
    }

    #[test]
    fn test_snapshot_for_date_takes_first_match() {
        let series = vec![
            entry("2024-06-01", 10, "clear sky"),
            entry("2024-06-01", 14, "few clouds"),
            entry("2024-06-02", 12, "light rain"),
        ];

        let snapshot = snapshot_for_date(&series, date("2024-06-01")).unwrap();
        assert_eq!(snapshot.temperature, 10);
        assert_eq!(snapshot.conditions, "clear sky");
    }

    #[test]
    fn test_snapshot_for_date_none_outside_horizon() {
        let series = vec![entry("2024-06-01", 10, "clear sky")];
        assert!(snapshot_for_date(&series, date("2024-06-09")).is_none());
    }

    #[test]
    fn test_fold_range_last_slot_of_day_wins() {
        let series = vec![
            entry("2024-06-01", 10, "clear sky"),
            entry("2024-06-01", 14, "few clouds"),
            entry("2024-06-02", 12, "light rain"),
        ];

        let by_date = fold_range(&series, date("2024-06-01"), date("2024-06-02"));
        assert_eq!(by_date.len(), 2);
        assert_eq!(by_date[&date("2024-06-01")].temperature, 14);
        assert_eq!(by_date[&date("2024-06-01")].description, "few clouds");
        assert_eq!(by_date[&date("2024-06-02")].temperature, 12);
    }

    #[test]
    fn test_fold_range_window_is_inclusive() {
        let series = vec![
            entry("2024-05-31", 8, "mist"),
            entry("2024-06-01", 10, "clear sky"),
            entry("2024-06-03", 11, "overcast clouds"),
        ];

        let by_date = fold_range(&series, date("2024-06-01"), date("2024-06-03"));
        assert!(!by_date.contains_key(&date("2024-05-31")));
        assert!(by_date.contains_key(&date("2024-06-01")));
        assert!(by_date.contains_key(&date("2024-06-03")));
    }

    #[test]
    fn test_convert_series_normalizes_temperature_and_icon() {
        let data = OWMForecastResponse {
            list: vec![OWMForecastItem {
                // 2024-06-01T12:00:00Z
                dt: 1_717_243_200,
                main: OWMMain { temp: 9.2 },
                weather: vec![OWMWeather {
                    description: "scattered clouds".to_string(),
                    icon: "03d".to_string(),
                }],
            }],
        };

        let series = convert_series(data);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, date("2024-06-01"));
        assert_eq!(series[0].temperature, 10);
        assert_eq!(series[0].icon, "http://openweathermap.org/img/wn/03d@2x.png");
    }
}

//! Subscription persistence and the recorded forecast snapshot
//!
//! One row per (email, crag, window) triple; no uniqueness constraint, so
//! resubscribing creates a duplicate row. Rows are created once, read by
//! the scanner, and never deleted; the default baseline policy never
//! updates them either.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{validate_date_window, validate_email, ForecastSnapshot};

use crate::error::{AppError, AppResult};

/// Subscription service for managing crag weather subscriptions
#[derive(Clone)]
pub struct SubscriptionService {
    db: PgPool,
}

/// A stored request to be alerted about forecast changes for one crag and
/// date window.
///
/// `lat`/`lon` are an immutable copy taken at subscription time, not a
/// live reference into the catalog.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub crag_name: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Weather description recorded at subscription time; NULL when the
    /// subscribe payload carried no forecast entry for the crag.
    pub conditions: Option<String>,
    /// Whole degrees Celsius recorded at subscription time.
    pub temperature: Option<i32>,
    pub email: String,
    pub lat: f64,
    pub lon: f64,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// The comparison baseline, when a full snapshot was recorded
    pub fn recorded_snapshot(&self) -> Option<ForecastSnapshot> {
        match (self.temperature, self.conditions.as_deref()) {
            (Some(temperature), Some(conditions)) => {
                Some(ForecastSnapshot::new(temperature, conditions))
            }
            _ => None,
        }
    }
}

/// One crag selected in a subscribe request, with the forecast mapping it
/// was displayed with.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectedCrag {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Date-keyed forecast entries. Payload insertion order is preserved;
    /// the first entry (not necessarily the one for `date_from`) becomes
    /// the recorded snapshot.
    #[serde(default)]
    pub weather: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of a multi-crag subscribe request.
///
/// Inserts are independent row writes: the first failure aborts the
/// remaining inserts and nothing already saved is rolled back.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionBatch {
    pub saved: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

/// A crag whose subscription row could not be saved
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub crag_name: String,
    pub error: String,
}

impl SubscriptionBatch {
    pub fn fully_saved(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Recorded snapshot fields from the first forecast entry of a selected
/// crag, in payload insertion order. Either field may be absent
/// independently.
pub fn first_snapshot(
    weather: &serde_json::Map<String, serde_json::Value>,
) -> (Option<i32>, Option<String>) {
    match weather.iter().next() {
        Some((_, entry)) => (
            entry
                .get("temperature")
                .and_then(serde_json::Value::as_i64)
                .map(|t| t as i32),
            entry
                .get("description")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
        ),
        None => (None, None),
    }
}

/// Validate a subscribe request before any row is written
pub fn validate_subscribe(
    email: &str,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> AppResult<()> {
    validate_email(email).map_err(|message| AppError::Validation {
        field: "email".to_string(),
        message: message.to_string(),
    })?;
    validate_date_window(date_from, date_to).map_err(|message| AppError::Validation {
        field: "dateFrom".to_string(),
        message: message.to_string(),
    })?;
    Ok(())
}

impl SubscriptionService {
    /// Create a new SubscriptionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Persist one subscription row per selected crag.
    ///
    /// Validation failures reject the whole request before any write.
    /// Insert failures abort the remaining inserts; already-saved rows
    /// stay (no rollback) and the batch reports both sides.
    pub async fn create_for_crags(
        &self,
        email: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
        crags: &[SelectedCrag],
    ) -> AppResult<SubscriptionBatch> {
        validate_subscribe(email, date_from, date_to)?;

        let mut batch = SubscriptionBatch {
            saved: Vec::new(),
            failed: Vec::new(),
        };

        for crag in crags {
            let (temperature, conditions) = first_snapshot(&crag.weather);

            let result = sqlx::query(
                r#"
                INSERT INTO user_subscriptions (
                    crag_name, date_from, date_to, conditions, temperature,
                    created_at, email, lat, lon
                )
                VALUES ($1, $2, $3, $4, $5, NOW(), $6, $7, $8)
                "#,
            )
            .bind(&crag.name)
            .bind(date_from)
            .bind(date_to)
            .bind(&conditions)
            .bind(temperature)
            .bind(email)
            .bind(crag.lat)
            .bind(crag.lon)
            .execute(&self.db)
            .await;

            match result {
                Ok(_) => batch.saved.push(crag.name.clone()),
                Err(e) => {
                    tracing::error!("Failed to save subscription for {}: {}", crag.name, e);
                    batch.failed.push(BatchFailure {
                        crag_name: crag.name.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        Ok(batch)
    }

    /// Subscriptions whose window has not started yet (or starts today).
    /// Rows with a past start date are skipped by the scanner, never
    /// deleted.
    pub async fn list_relevant(&self) -> AppResult<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, crag_name, date_from, date_to, conditions, temperature,
                   email, lat, lon, created_at
            FROM user_subscriptions
            WHERE date_from >= CURRENT_DATE
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(subscriptions)
    }

    /// Overwrite the recorded snapshot for a subscription. Only the
    /// `AdvanceAfterNotify` baseline policy calls this.
    pub async fn advance_snapshot(&self, id: Uuid, snapshot: &ForecastSnapshot) -> AppResult<()> {
        sqlx::query(
            "UPDATE user_subscriptions SET conditions = $2, temperature = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(&snapshot.conditions)
        .bind(snapshot.temperature)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_map(json: &str) -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_first_snapshot_uses_payload_order_not_date_order() {
        // The mapping is built non-chronologically; the first entry in
        // insertion order wins, not the earliest date.
        let weather = weather_map(
            r#"{
                "2024-06-05": {"temperature": 18, "description": "light rain"},
                "2024-06-01": {"temperature": 12, "description": "clear sky"}
            }"#,
        );

        let (temperature, conditions) = first_snapshot(&weather);
        assert_eq!(temperature, Some(18));
        assert_eq!(conditions.as_deref(), Some("light rain"));
    }

    #[test]
    fn test_first_snapshot_empty_mapping() {
        let weather = weather_map("{}");
        assert_eq!(first_snapshot(&weather), (None, None));
    }

    #[test]
    fn test_first_snapshot_partial_entry() {
        let weather = weather_map(r#"{"2024-06-01": {"temperature": 12}}"#);
        let (temperature, conditions) = first_snapshot(&weather);
        assert_eq!(temperature, Some(12));
        assert_eq!(conditions, None);
    }

    #[test]
    fn test_recorded_snapshot_requires_both_fields() {
        let mut subscription = Subscription {
            id: Uuid::new_v4(),
            crag_name: "Val-David".to_string(),
            date_from: "2024-06-01".parse().unwrap(),
            date_to: "2024-06-05".parse().unwrap(),
            conditions: Some("clear sky".to_string()),
            temperature: Some(12),
            email: "climber@example.com".to_string(),
            lat: 46.03,
            lon: -74.22,
            created_at: Utc::now(),
        };

        assert_eq!(
            subscription.recorded_snapshot(),
            Some(ForecastSnapshot::new(12, "clear sky"))
        );

        subscription.conditions = None;
        assert!(subscription.recorded_snapshot().is_none());
    }
}

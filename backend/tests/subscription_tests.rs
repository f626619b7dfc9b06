//! Subscription tests
//!
//! Covers snapshot extraction from subscribe payloads, subscribe
//! validation, and the batch outcome shape.

use crag_weather_backend::services::subscription::{
    first_snapshot, validate_subscribe, BatchFailure, SubscriptionBatch,
};

fn weather_map(json: &str) -> serde_json::Map<String, serde_json::Value> {
    serde_json::from_str(json).unwrap()
}

fn date(s: &str) -> chrono::NaiveDate {
    s.parse().unwrap()
}

// ============================================================================
// Snapshot extraction
// ============================================================================

mod snapshot_extraction {
    use super::*;

    /// The first entry in payload insertion order becomes the recorded
    /// snapshot, even when the mapping was built non-chronologically.
    #[test]
    fn test_first_entry_in_insertion_order_wins() {
        let weather = weather_map(
            r#"{
                "2024-06-03": {"temperature": 18, "description": "overcast clouds"},
                "2024-06-01": {"temperature": 12, "description": "clear sky"},
                "2024-06-02": {"temperature": 15, "description": "few clouds"}
            }"#,
        );

        let (temperature, conditions) = first_snapshot(&weather);
        assert_eq!(temperature, Some(18));
        assert_eq!(conditions.as_deref(), Some("overcast clouds"));
    }

    #[test]
    fn test_empty_mapping_records_nothing() {
        assert_eq!(first_snapshot(&weather_map("{}")), (None, None));
    }

    #[test]
    fn test_fields_extract_independently() {
        let only_temp = weather_map(r#"{"2024-06-01": {"temperature": 12}}"#);
        assert_eq!(first_snapshot(&only_temp), (Some(12), None));

        let only_conditions = weather_map(r#"{"2024-06-01": {"description": "clear sky"}}"#);
        assert_eq!(
            first_snapshot(&only_conditions),
            (None, Some("clear sky".to_string()))
        );
    }

    #[test]
    fn test_non_numeric_temperature_is_ignored() {
        let weather = weather_map(r#"{"2024-06-01": {"temperature": "warm", "description": "clear sky"}}"#);
        let (temperature, conditions) = first_snapshot(&weather);
        assert_eq!(temperature, None);
        assert_eq!(conditions.as_deref(), Some("clear sky"));
    }
}

// ============================================================================
// Validation
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn test_valid_request_passes() {
        assert!(validate_subscribe(
            "climber@example.com",
            date("2024-06-01"),
            date("2024-06-05")
        )
        .is_ok());
    }

    #[test]
    fn test_empty_email_is_rejected() {
        assert!(validate_subscribe("", date("2024-06-01"), date("2024-06-05")).is_err());
        assert!(validate_subscribe("   ", date("2024-06-01"), date("2024-06-05")).is_err());
    }

    #[test]
    fn test_reversed_window_is_rejected() {
        assert!(validate_subscribe(
            "climber@example.com",
            date("2024-06-05"),
            date("2024-06-01")
        )
        .is_err());
    }

    #[test]
    fn test_single_day_window_is_allowed() {
        assert!(validate_subscribe(
            "climber@example.com",
            date("2024-06-01"),
            date("2024-06-01")
        )
        .is_ok());
    }
}

// ============================================================================
// Batch outcome
// ============================================================================

mod batch {
    use super::*;

    #[test]
    fn test_fully_saved_batch() {
        let batch = SubscriptionBatch {
            saved: vec!["Val-David".to_string(), "Weir".to_string()],
            failed: vec![],
        };
        assert!(batch.fully_saved());
    }

    /// A failed insert aborts the remaining crags: the batch carries the
    /// rows that were saved before the failure (they are not rolled
    /// back) plus the failure itself.
    #[test]
    fn test_partial_batch_is_not_fully_saved() {
        let batch = SubscriptionBatch {
            saved: vec!["Val-David".to_string()],
            failed: vec![BatchFailure {
                crag_name: "Weir".to_string(),
                error: "connection closed".to_string(),
            }],
        };
        assert!(!batch.fully_saved());
        assert_eq!(batch.saved.len(), 1);
    }
}

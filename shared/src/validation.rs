//! Validation utilities for the Crag Weather Platform

use chrono::NaiveDate;

/// Validate that a date window is ordered (`date_from <= date_to`)
pub fn validate_date_window(date_from: NaiveDate, date_to: NaiveDate) -> Result<(), &'static str> {
    if date_from > date_to {
        return Err("dateFrom must not be after dateTo");
    }
    Ok(())
}

/// Validate that a temperature band is ordered (`min_temp <= max_temp`)
pub fn validate_temperature_band(min_temp: i32, max_temp: i32) -> Result<(), &'static str> {
    if min_temp > max_temp {
        return Err("minTemp must not exceed maxTemp");
    }
    Ok(())
}

/// Validate that a recipient email address has the minimal shape we rely on
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err("email must not be empty");
    }
    if !trimmed.contains('@') {
        return Err("email must contain '@'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate_date_window_ordered() {
        assert!(validate_date_window(date("2024-06-01"), date("2024-06-05")).is_ok());
        assert!(validate_date_window(date("2024-06-01"), date("2024-06-01")).is_ok());
    }

    #[test]
    fn test_validate_date_window_reversed() {
        assert!(validate_date_window(date("2024-06-05"), date("2024-06-01")).is_err());
    }

    #[test]
    fn test_validate_temperature_band() {
        assert!(validate_temperature_band(10, 20).is_ok());
        assert!(validate_temperature_band(15, 15).is_ok());
        assert!(validate_temperature_band(20, 10).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("climber@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("not-an-address").is_err());
    }
}

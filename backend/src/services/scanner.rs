//! Alert scanner: the recurring forecast-diffing pass
//!
//! For every still-relevant subscription, fetches the live forecast for
//! the saved location and window start date, compares it against the
//! snapshot recorded at subscription time, and emails an alert when the
//! two differ materially. Each subscription is processed independently;
//! no failure aborts the pass.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use shared::ForecastSnapshot;

use crate::error::{AppError, AppResult};
use crate::external::mail::MailerClient;
use crate::external::weather::WeatherClient;
use crate::services::subscription::{Subscription, SubscriptionService};

/// What happens to the stored comparison baseline after an alert is sent.
///
/// `KeepOriginal` never moves the baseline: a forecast that changes once
/// and stays changed re-alerts on every pass. `AdvanceAfterNotify`
/// overwrites the baseline with the forecast just reported, so each change
/// alerts once. Nothing else in the scanner differs between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselinePolicy {
    #[default]
    KeepOriginal,
    AdvanceAfterNotify,
}

/// Outcome of evaluating one subscription in one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No live forecast for the window start date, or no recorded
    /// snapshot to compare against.
    SkippedNoForecast,
    Unchanged,
    Changed {
        recorded: ForecastSnapshot,
        new: ForecastSnapshot,
    },
}

/// Totals for one scan pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Subscriptions considered, including skipped ones
    pub checked: usize,
    /// Alert emails successfully sent
    pub sent: usize,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checked {} forecasts. Emails sent: {}",
            self.checked, self.sent
        )
    }
}

/// The change predicate: a new forecast counts as materially different
/// when the temperature moved by MORE than 1 °C (a 1-degree move does not
/// trigger) or the case-folded conditions differ. Conditions equality is
/// exact after case-folding; "light rain" and "rain" are different.
pub fn forecast_changed(recorded: &ForecastSnapshot, new: &ForecastSnapshot) -> bool {
    (new.temperature - recorded.temperature).abs() > 1
        || new.conditions.to_lowercase() != recorded.conditions.to_lowercase()
}

/// Evaluate one subscription against the live forecast, if any
pub fn evaluate(subscription: &Subscription, live: Option<ForecastSnapshot>) -> ScanOutcome {
    let Some(recorded) = subscription.recorded_snapshot() else {
        return ScanOutcome::SkippedNoForecast;
    };
    let Some(new) = live else {
        return ScanOutcome::SkippedNoForecast;
    };

    if forecast_changed(&recorded, &new) {
        ScanOutcome::Changed { recorded, new }
    } else {
        ScanOutcome::Unchanged
    }
}

/// Body of a forecast-change alert email
pub fn alert_body(
    crag_name: &str,
    date_from: NaiveDate,
    recorded: &ForecastSnapshot,
    new: &ForecastSnapshot,
) -> String {
    format!(
        "Hi,\n\n\
         The weather forecast for {} on {} has changed.\n\n\
         Original Forecast:\n\
         - Temperature: {}°C\n\
         - Conditions: {}\n\n\
         Updated Forecast:\n\
         - Temperature: {}°C\n\
         - Conditions: {}\n\n\
         Please check the latest forecast before planning your activities.\n\n\
         Regards,\n\
         Your Weather Monitor\n",
        crag_name,
        date_from,
        recorded.temperature,
        recorded.conditions,
        new.temperature,
        new.conditions
    )
}

/// The recurring alert scanner
pub struct AlertScanner {
    subscriptions: SubscriptionService,
    weather: WeatherClient,
    mailer: MailerClient,
    baseline: BaselinePolicy,
    pass_in_progress: AtomicBool,
}

impl AlertScanner {
    /// Create a scanner with the default baseline policy
    pub fn new(
        subscriptions: SubscriptionService,
        weather: WeatherClient,
        mailer: MailerClient,
    ) -> Self {
        Self {
            subscriptions,
            weather,
            mailer,
            baseline: BaselinePolicy::default(),
            pass_in_progress: AtomicBool::new(false),
        }
    }

    /// Override the baseline policy
    pub fn with_baseline_policy(mut self, baseline: BaselinePolicy) -> Self {
        self.baseline = baseline;
        self
    }

    /// Run one pass unless another is already in flight. A firing that
    /// would overlap is skipped and logged rather than interleaved.
    pub async fn run_exclusive(&self) -> AppResult<Option<ScanReport>> {
        if self
            .pass_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Skipping scan pass: previous pass still running");
            return Ok(None);
        }

        let result = self.run_pass().await;
        self.pass_in_progress.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    /// One scan pass over all still-relevant subscriptions.
    ///
    /// Only the window start date is checked against the live forecast,
    /// not the full range. Forecast and mail failures skip the item and
    /// never abort the pass.
    pub async fn run_pass(&self) -> AppResult<ScanReport> {
        let subscriptions = self.subscriptions.list_relevant().await?;
        let mut report = ScanReport {
            checked: subscriptions.len(),
            sent: 0,
        };

        for subscription in &subscriptions {
            let live = match self
                .weather
                .forecast_for_date(subscription.lat, subscription.lon, subscription.date_from)
                .await
            {
                Ok(live) => live,
                Err(e) => {
                    tracing::warn!(
                        "Forecast fetch failed for {} on {}: {}",
                        subscription.crag_name,
                        subscription.date_from,
                        e
                    );
                    None
                }
            };

            match evaluate(subscription, live) {
                ScanOutcome::SkippedNoForecast => {
                    tracing::debug!(
                        "No forecast for {} on {}, skipping",
                        subscription.crag_name,
                        subscription.date_from
                    );
                }
                ScanOutcome::Unchanged => {}
                ScanOutcome::Changed { recorded, new } => {
                    match self.send_alert(subscription, &recorded, &new).await {
                        Ok(()) => {
                            report.sent += 1;
                            if self.baseline == BaselinePolicy::AdvanceAfterNotify {
                                if let Err(e) = self
                                    .subscriptions
                                    .advance_snapshot(subscription.id, &new)
                                    .await
                                {
                                    tracing::error!(
                                        "Failed to advance snapshot for {}: {}",
                                        subscription.id,
                                        e
                                    );
                                }
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                "Failed to send alert for {}: {}",
                                subscription.crag_name,
                                e
                            );
                        }
                    }
                }
            }
        }

        tracing::info!("{}", report);
        Ok(report)
    }

    async fn send_alert(
        &self,
        subscription: &Subscription,
        recorded: &ForecastSnapshot,
        new: &ForecastSnapshot,
    ) -> AppResult<()> {
        let body = alert_body(&subscription.crag_name, subscription.date_from, recorded, new);
        self.mailer
            .send("Weather Forecast Changed", &subscription.email, &body)
            .await
            .map_err(AppError::MailTransport)
    }
}

/// Spawn the recurring scan task: one guarded pass per tick. A pass that
/// outlives the interval causes the next firing to be skipped, not
/// overlapped.
pub fn spawn_recurring(scanner: Arc<AlertScanner>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; consume it so
        // passes start one period after boot.
        interval.tick().await;

        loop {
            interval.tick().await;
            match scanner.run_exclusive().await {
                Ok(Some(report)) => tracing::info!("Scheduled scan complete: {}", report),
                Ok(None) => {}
                Err(e) => tracing::error!("Scheduled scan failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(temperature: i32, conditions: &str) -> ForecastSnapshot {
        ForecastSnapshot::new(temperature, conditions)
    }

    #[test]
    fn test_one_degree_does_not_trigger() {
        let recorded = snapshot(10, "clear sky");
        assert!(!forecast_changed(&recorded, &snapshot(11, "clear sky")));
        assert!(!forecast_changed(&recorded, &snapshot(9, "clear sky")));
        assert!(!forecast_changed(&recorded, &snapshot(10, "clear sky")));
    }

    #[test]
    fn test_two_degrees_trigger() {
        let recorded = snapshot(10, "clear sky");
        assert!(forecast_changed(&recorded, &snapshot(12, "clear sky")));
        assert!(forecast_changed(&recorded, &snapshot(8, "clear sky")));
    }

    #[test]
    fn test_conditions_compare_case_folded() {
        let recorded = snapshot(10, "clear sky");
        assert!(!forecast_changed(&recorded, &snapshot(10, "Clear Sky")));
        assert!(forecast_changed(&recorded, &snapshot(10, "Light Rain")));
    }

    #[test]
    fn test_no_synonym_handling() {
        let recorded = snapshot(10, "rain");
        assert!(forecast_changed(&recorded, &snapshot(10, "light rain")));
    }

    #[test]
    fn test_report_display() {
        let report = ScanReport { checked: 7, sent: 2 };
        assert_eq!(report.to_string(), "Checked 7 forecasts. Emails sent: 2");
    }

    #[test]
    fn test_alert_body_contains_both_forecasts() {
        let body = alert_body(
            "Val-David",
            "2024-06-01".parse().unwrap(),
            &snapshot(10, "clear sky"),
            &snapshot(14, "light rain"),
        );
        assert!(body.contains("Val-David"));
        assert!(body.contains("2024-06-01"));
        assert!(body.contains("10°C"));
        assert!(body.contains("clear sky"));
        assert!(body.contains("14°C"));
        assert!(body.contains("light rain"));
    }
}

//! Mail relay client for outbound notification email
//!
//! Posts plain-text messages to an HTTP mail relay API using a bearer
//! token. The relay owns SMTP delivery; this client only needs the
//! send(subject, recipient, body) capability.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Per-request timeout so a hung relay call cannot stall a scan pass.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Mail relay API client
#[derive(Clone)]
pub struct MailerClient {
    http_client: Client,
    api_endpoint: String,
    api_key: String,
    sender: String,
}

/// Outbound message request
#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mail relay API response
#[derive(Debug, Deserialize)]
struct MailApiResponse {
    #[serde(default)]
    message: Option<String>,
}

impl MailerClient {
    /// Create a new mail relay client
    pub fn new(api_endpoint: String, api_key: String, sender: String) -> Self {
        Self {
            http_client: Client::new(),
            api_endpoint,
            api_key,
            sender,
        }
    }

    /// Send a plain-text message to a single recipient
    pub async fn send(&self, subject: &str, recipient: &str, body: &str) -> Result<(), String> {
        let request = OutboundMessage {
            from: &self.sender,
            to: recipient,
            subject,
            text: body,
        };

        let response = self
            .http_client
            .post(&self.api_endpoint)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to send mail: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error: MailApiResponse = response.json().await.unwrap_or(MailApiResponse {
                message: Some("Unknown error".to_string()),
            });
            Err(error.message.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}

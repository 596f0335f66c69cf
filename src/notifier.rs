//! Outbound notifications through a Signal REST gateway
//!
//! Messages are sent once. Failures are reported to the caller, which logs
//! and drops them; nothing is queued or retried.

use crate::config::SignalConfig;
use crate::error::{Result, WallwatchError};
use crate::logging::{StructuredLogger, get_logger};
use serde::Serialize;
use std::time::Duration;

/// Accepts finished notification text
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Body of `POST /v2/send`
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: &'a str,
    number: &'a str,
    recipients: &'a [String],
}

/// signal-cli-rest-api client
pub struct SignalNotifier {
    http: reqwest::Client,
    url: String,
    own_number: String,
    recipients: Vec<String>,
    logger: StructuredLogger,
}

impl SignalNotifier {
    pub fn new(config: &SignalConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| WallwatchError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: format!("http://{}:{}/v2/send", config.host, config.port),
            own_number: config.own_number.clone(),
            recipients: config.recipients.clone(),
            logger: get_logger("notifier"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl Notifier for SignalNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let body = SendRequest {
            message,
            number: &self.own_number,
            recipients: &self.recipients,
        };

        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            self.logger
                .info(&format!("Successfully sent message: {}", text));
            Ok(())
        } else {
            Err(WallwatchError::notify(format!(
                "Gateway answered {}: {}",
                status, text
            )))
        }
    }
}

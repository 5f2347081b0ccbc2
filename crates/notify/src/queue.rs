//! HTTP notifier for the messaging queue service.
//!
//! Payloads are POSTed as JSON to the queue URL; reachability is probed
//! with a GET against a separate health URL.

use std::time::Duration;

use crate::payload::NotificationPayload;
use crate::traits::{Notifier, NotifyError};

/// Delivers notifications as JSON over HTTP to the messaging queue.
///
/// Every request shares one client whose timeout bounds the whole call,
/// so a hung queue surfaces as a [`NotifyError::Http`] timeout.
#[derive(Debug)]
pub struct QueueNotifier {
    url: reqwest::Url,
    health_url: reqwest::Url,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl QueueNotifier {
    /// Create a notifier. Both URLs are validated eagerly.
    pub fn new(url: &str, health_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let url = parse_url("queue", url)?;
        let health_url = parse_url("queue health", health_url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            health_url,
            client,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

fn parse_url(what: &str, raw: &str) -> Result<reqwest::Url, NotifyError> {
    let parsed = reqwest::Url::parse(raw)
        .map_err(|e| NotifyError::Config(format!("invalid {what} URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NotifyError::Config(format!(
            "unsupported {what} URL scheme '{other}'"
        ))),
    }
}

#[async_trait::async_trait]
impl Notifier for QueueNotifier {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(payload)?;

        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "messaging queue returned non-2xx status"
            );
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            url = %self.url,
            task_id = %payload.task_id,
            status = %status,
            "notification queued"
        );

        Ok(())
    }

    async fn health_check(&self) -> Result<(), NotifyError> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(NotifyError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }

    fn channel_name(&self) -> &str {
        "messaging_queue"
    }
}

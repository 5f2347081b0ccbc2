//! Notifier trait definition and shared error types.

use crate::payload::NotificationPayload;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NotifyError {
    /// True when the sink never answered within the client timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NotifyError::Http(e) if e.is_timeout())
    }
}

/// Outbound notification sink.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one payload. `Ok` only on a confirmed-successful response.
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;

    /// Reachability probe for the sink.
    async fn health_check(&self) -> Result<(), NotifyError>;

    /// Human-readable name for this sink (e.g., "messaging_queue").
    fn channel_name(&self) -> &str;
}

/// Result of one delivery attempt.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub channel: String,
    pub task_id: String,
    pub threshold: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

//! Notification delivery for deadline alerts.
//!
//! This crate provides:
//! - `NotificationPayload`, the JSON body the messaging queue consumes
//! - `Notifier` trait for the outbound sink
//! - `QueueNotifier`, the HTTP implementation posting to the messaging queue
//! - `Dispatcher`, which times and logs each delivery attempt

pub mod dispatcher;
pub mod payload;
pub mod queue;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use payload::{NotificationPayload, NotificationType};
pub use queue::QueueNotifier;
pub use traits::{DispatchResult, Notifier, NotifyError};

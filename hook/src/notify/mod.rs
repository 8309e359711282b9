//! Deploy notifications

pub mod message;
pub mod sinks;

use async_trait::async_trait;

use crate::errors::HookError;
use crate::notify::message::DeployNotification;

/// Destination of deploy notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification; failures are reported, never retried
    async fn send(&self, notification: &DeployNotification) -> Result<(), HookError>;
}

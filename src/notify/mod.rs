// ABOUTME: Deployment status notifications.
// ABOUTME: Defines the notification payload, the Notifier trait, and the webhook implementation.

mod webhook;

use async_trait::async_trait;
use serde::Serialize;

use crate::deploy::{Deployment, DeploymentStatus};
use crate::types::DeploymentId;

pub use webhook::WebhookNotifier;

/// Payload delivered when a deployment reaches a notable status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub deployment_id: DeploymentId,
    pub stack_name: String,
    pub status: DeploymentStatus,
    pub event_type: String,
    pub message: String,
    pub timestamp: i64,
    /// Host that ran the orchestrator.
    pub host: String,
}

impl Notification {
    pub fn for_deployment(
        deployment: &Deployment,
        event_type: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            deployment_id: deployment.id.clone(),
            stack_name: deployment.stack_name.clone(),
            status: deployment.status,
            event_type: event_type.to_string(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp(),
            host: gethostname::gethostname().to_string_lossy().into_owned(),
        }
    }
}

/// Errors delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid webhook url '{0}'")]
    InvalidUrl(String),

    #[error("unsupported webhook scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("failed to connect to webhook: {0}")]
    Connect(#[source] std::io::Error),

    #[error("TLS handshake with webhook failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("webhook HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to build webhook request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("webhook rejected notification with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("webhook did not respond in time")]
    Timeout,

    #[error("failed to encode notification: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Delivers notifications to a destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, destination: &str, notification: &Notification)
    -> Result<(), NotifyError>;
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        destination: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            destination,
            deployment = %notification.deployment_id,
            status = %notification.status,
            event = %notification.event_type,
            "notification"
        );
        Ok(())
    }
}

//! Error types for the notification system.

use thiserror::Error;

/// Errors surfaced to callers of the dispatcher.
///
/// These indicate misconfiguration (bad templates, incomplete events,
/// unregistered platforms) and are never produced by network failures.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// An event field required by the template was missing or unusable
    #[error("template '{template}' could not be rendered: {reason}")]
    TemplateField { template: String, reason: String },

    /// A template failed to compile
    #[error("template '{template}' is invalid: {reason}")]
    TemplateSyntax { template: String, reason: String },

    /// No handler is registered for the requested platform
    #[error("no handler registered for platform '{0}'")]
    UnknownPlatform(String),
}

/// Errors raised by a [`Transport`](crate::transport::Transport).
///
/// Handlers catch these and report them as
/// [`Delivery::Dropped`](crate::Delivery::Dropped).
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Webhook answered with a non-success status
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Webhook accepted the request but rejected the message
    #[error("webhook rejected message (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request signing failed
    #[error("request signing failed: {0}")]
    Signing(String),
}

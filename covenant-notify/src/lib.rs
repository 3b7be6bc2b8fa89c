//! Covenant Notify - Outbound Email
//!
//! The lifecycle manager hands fully rendered messages to a [`Notifier`].
//! It does not inspect delivery status beyond success or failure of the
//! send call, and nothing here retries.

mod http;
mod mock;

pub use http::{HttpNotifier, NotifierConfig};
pub use mock::MockNotifier;

use async_trait::async_trait;
use covenant_core::NotifyError;
use serde::{Deserialize, Serialize};

/// Result type for notifier calls.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutboundEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        }
    }
}

/// Sends templated HTML email.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message.
    async fn send(&self, email: &OutboundEmail) -> NotifyResult<()>;
}

/// Minimal recipient sanity check shared by providers.
pub fn validate_recipient(to: &str) -> NotifyResult<()> {
    let trimmed = to.trim();
    let valid = !trimmed.is_empty()
        && !trimmed.contains(char::is_whitespace)
        && trimmed
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(NotifyError::InvalidRecipient {
            recipient: to.to_string(),
        })
    }
}

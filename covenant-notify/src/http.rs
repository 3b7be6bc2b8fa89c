//! HTTP email provider.
//!
//! Posts `{from, to, subject, html}` as JSON to `<api_base_url>/emails` with a
//! bearer token, the shape used by common transactional email APIs.

use crate::{validate_recipient, Notifier, NotifyResult, OutboundEmail};
use async_trait::async_trait;
use covenant_core::{ConfigError, NotifyError};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

/// Email provider configuration.
#[derive(Clone)]
pub struct NotifierConfig {
    /// Provider API base, e.g. "https://api.resend.com".
    pub api_base_url: String,
    /// Provider API key. Never logged.
    pub api_key: SecretString,
    /// Sender address, e.g. "Covenant <billing@example.com>".
    pub from_address: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotifierConfig {
    /// Create NotifierConfig from environment variables.
    ///
    /// Environment variables:
    /// - `COVENANT_EMAIL_API_BASE_URL`: Provider base URL (default: https://api.resend.com)
    /// - `COVENANT_EMAIL_API_KEY`: Provider API key (required)
    /// - `COVENANT_EMAIL_FROM`: Sender address (required)
    /// - `COVENANT_EMAIL_TIMEOUT_SECS`: Request timeout (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = std::env::var("COVENANT_EMAIL_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.resend.com".to_string());

        let api_key = std::env::var("COVENANT_EMAIL_API_KEY").map_err(|_| {
            ConfigError::MissingRequired {
                field: "COVENANT_EMAIL_API_KEY".to_string(),
            }
        })?;

        let from_address =
            std::env::var("COVENANT_EMAIL_FROM").map_err(|_| ConfigError::MissingRequired {
                field: "COVENANT_EMAIL_FROM".to_string(),
            })?;

        let timeout_secs = std::env::var("COVENANT_EMAIL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let config = Self {
            api_base_url,
            api_key: SecretString::new(api_key.into()),
            from_address,
            timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url".to_string(),
                value: self.api_base_url.clone(),
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api_key".to_string(),
            });
        }
        if self.from_address.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "from_address".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.api_base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Notifier backed by an HTTP email API.
#[derive(Clone)]
pub struct HttpNotifier {
    config: NotifierConfig,
    http_client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(config: NotifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                value: config.api_base_url.clone(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, email: &OutboundEmail) -> NotifyResult<()> {
        validate_recipient(&email.to)?;

        let body = SendEmailBody {
            from: &self.config.from_address,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .http_client
            .post(self.config.endpoint())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = %email.to, subject = %email.subject, "Email accepted by provider");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        tracing::warn!(
            to = %email.to,
            status = %status,
            "Email provider rejected message"
        );
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

//! Lifecycle Configuration Module
//!
//! Deployment settings for the lifecycle manager: public URLs embedded in
//! emails, branding, the General Public sentinel client, and the retry limit
//! for concurrent metadata updates. Loaded from environment variables with
//! defaults suitable for development.

use covenant_core::ConfigError;

// ============================================================================
// LIFECYCLE CONFIGURATION
// ============================================================================

/// Lifecycle manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    // ========================================================================
    // Public surface
    // ========================================================================
    /// Base URL of the client-facing app. Pay links are
    /// `<app_base_url>/pay/<link_id>`, MSA review is
    /// `<app_base_url>/msa/<client_id>`.
    pub app_base_url: String,

    /// Brand shown in email subjects and footers.
    pub brand_name: String,

    // ========================================================================
    // General Public sentinel
    // ========================================================================
    /// Email of the shared client that owns ad-hoc payment links.
    pub general_public_email: String,

    /// Display name of the sentinel client.
    pub general_public_name: String,

    // ========================================================================
    // Payment links
    // ========================================================================
    /// `created_by` marker stamped on links created by the lifecycle manager.
    pub created_by: String,

    /// Currency used when a request does not name one.
    pub default_currency: String,

    // ========================================================================
    // Concurrency
    // ========================================================================
    /// How many times a metadata write is retried after a version conflict.
    pub metadata_retry_limit: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            app_base_url: "http://localhost:3000".to_string(),
            brand_name: "Covenant".to_string(),
            general_public_email: "general-public@covenant.local".to_string(),
            general_public_name: "General Public".to_string(),
            created_by: "protocol-admin".to_string(),
            default_currency: "USD".to_string(),
            metadata_retry_limit: 3,
        }
    }
}

impl LifecycleConfig {
    /// Create LifecycleConfig from environment variables.
    ///
    /// Environment variables:
    /// - `COVENANT_APP_BASE_URL`: Client-facing app URL (default: http://localhost:3000)
    /// - `COVENANT_BRAND_NAME`: Brand used in emails (default: Covenant)
    /// - `COVENANT_GENERAL_PUBLIC_EMAIL`: Sentinel client email
    /// - `COVENANT_GENERAL_PUBLIC_NAME`: Sentinel client name (default: General Public)
    /// - `COVENANT_CREATED_BY`: Link creator marker (default: protocol-admin)
    /// - `COVENANT_DEFAULT_CURRENCY`: Default link currency (default: USD)
    /// - `COVENANT_METADATA_RETRY_LIMIT`: Version-conflict retries (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str, fallback: String| std::env::var(name).unwrap_or(fallback);

        let metadata_retry_limit = match std::env::var("COVENANT_METADATA_RETRY_LIMIT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "COVENANT_METADATA_RETRY_LIMIT".to_string(),
                value: raw.clone(),
                reason: "must be a non-negative integer".to_string(),
            })?,
            Err(_) => defaults.metadata_retry_limit,
        };

        let config = Self {
            app_base_url: var("COVENANT_APP_BASE_URL", defaults.app_base_url),
            brand_name: var("COVENANT_BRAND_NAME", defaults.brand_name),
            general_public_email: var(
                "COVENANT_GENERAL_PUBLIC_EMAIL",
                defaults.general_public_email,
            ),
            general_public_name: var("COVENANT_GENERAL_PUBLIC_NAME", defaults.general_public_name),
            created_by: var("COVENANT_CREATED_BY", defaults.created_by),
            default_currency: var("COVENANT_DEFAULT_CURRENCY", defaults.default_currency),
            metadata_retry_limit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.app_base_url.starts_with("http://") || self.app_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                field: "app_base_url".to_string(),
                value: self.app_base_url.clone(),
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if covenant_notify::validate_recipient(&self.general_public_email).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "general_public_email".to_string(),
                value: self.general_public_email.clone(),
                reason: "must be an email address".to_string(),
            });
        }
        for (field, value) in [
            ("brand_name", &self.brand_name),
            ("general_public_name", &self.general_public_name),
            ("created_by", &self.created_by),
            ("default_currency", &self.default_currency),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Public pay-and-accept URL for a payment link.
    pub fn pay_url(&self, link_id: impl std::fmt::Display) -> String {
        format!("{}/pay/{}", self.base(), link_id)
    }

    /// Public MSA review URL for a client.
    pub fn msa_url(&self, client_id: impl std::fmt::Display) -> String {
        format!("{}/msa/{}", self.base(), client_id)
    }

    fn base(&self) -> &str {
        self.app_base_url.trim_end_matches('/')
    }
}

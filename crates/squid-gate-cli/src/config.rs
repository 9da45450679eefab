// crates/squid-gate-cli/src/config.rs
// ============================================================================
// Module: Squid Gate Configuration
// Description: Command-line and environment configuration for the helper.
// Purpose: Parse, validate, and convert startup settings into component configs.
// Dependencies: clap, squid-gate-core, squid-gate-providers, squid-gate-store-sqlite, url
// ============================================================================

//! ## Overview
//! Settings are parsed once at startup. Every flag has an environment
//! fallback so the helper can be configured from the proxy's
//! `url_rewrite_program` line or from its service environment.
//! Validation fails closed: an invalid value stops the helper before it
//! answers a single request.
//! Invariants:
//! - The API key is never rendered by help output or error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use clap::Parser;
use squid_gate_core::QualityThresholds;
use squid_gate_providers::DEFAULT_METADATA_ENDPOINT;
use squid_gate_providers::DEFAULT_TIMEOUT_MS;
use squid_gate_providers::YouTubeMetadataConfig;
use squid_gate_store_sqlite::SqliteStoreConfig;
use thiserror::Error;
use url::Url;

use crate::redirector::RedirectorConfig;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default daily viewing limit in minutes.
pub const DEFAULT_LIMIT_MINUTES: u64 = 120;
/// Default minimum view count.
pub const DEFAULT_VIEW_LOW_WATERMARK: u64 = 1_000;
/// Default minimum good-vote percentage.
pub const DEFAULT_GOOD_BAD_RATE: u64 = 70;
/// Default quota database path.
pub const DEFAULT_STATE_PATH: &str = "/tmp/squid_filter.sqlite3";
/// Default rewrite destination.
pub const DEFAULT_SAFE_URL: &str = "https://www.google.com";
/// Default host marker for gated requests.
pub const DEFAULT_PROVIDER_MARKER: &str = "youtube";
/// Default query parameter carrying the content identifier.
pub const DEFAULT_CONTENT_PARAM: &str = "v";
/// Default syslog datagram socket.
pub const DEFAULT_SYSLOG_SOCKET: &str = "/dev/log";
/// Largest accepted daily limit (one full day).
const MAX_LIMIT_MINUTES: u64 = 24 * 60;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Startup settings for the `squid-gate` helper.
#[derive(Parser, Clone)]
#[command(
    name = "squid-gate",
    version,
    about = "Squid URL-rewrite helper that gates video playback by quality and a daily time budget"
)]
pub struct GateArgs {
    /// YouTube Data API key; empty disables metadata lookups.
    #[arg(
        long,
        env = "SQUID_YT_API_KEY",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub api_key: String,
    /// Daily viewing limit in minutes.
    #[arg(long, env = "SQUID_YT_LIMIT_MINUTES", default_value_t = DEFAULT_LIMIT_MINUTES)]
    pub limit_minutes: u64,
    /// Minimum view count for content to pass the quality gate.
    #[arg(long, env = "SQUID_YT_VIEW_LOW_WATERMARK", default_value_t = DEFAULT_VIEW_LOW_WATERMARK)]
    pub view_low_watermark: u64,
    /// Minimum good-vote percentage (0-100) for content to pass the quality gate.
    #[arg(long, env = "SQUID_YT_GOOD_BAD_RATE", default_value_t = DEFAULT_GOOD_BAD_RATE)]
    pub good_bad_rate: u64,
    /// Path of the SQLite quota database.
    #[arg(long, env = "SQUID_YT_STATE_PATH", default_value = DEFAULT_STATE_PATH)]
    pub state_path: PathBuf,
    /// Destination substituted for rejected requests.
    #[arg(long, env = "SQUID_YT_SAFE_URL", default_value = DEFAULT_SAFE_URL)]
    pub safe_url: String,
    /// Substring of the request host that marks a gated request.
    #[arg(long, env = "SQUID_YT_PROVIDER_MARKER", default_value = DEFAULT_PROVIDER_MARKER)]
    pub provider_marker: String,
    /// Query parameter carrying the content identifier.
    #[arg(long, env = "SQUID_YT_CONTENT_PARAM", default_value = DEFAULT_CONTENT_PARAM)]
    pub content_param: String,
    /// Metadata API endpoint.
    #[arg(long, env = "SQUID_YT_METADATA_ENDPOINT", default_value = DEFAULT_METADATA_ENDPOINT)]
    pub metadata_endpoint: String,
    /// Metadata request timeout in milliseconds.
    #[arg(long, env = "SQUID_YT_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
    /// Append audit events to this file instead of stderr.
    #[arg(long, env = "SQUID_YT_AUDIT_LOG")]
    pub audit_log: Option<PathBuf>,
    /// Send audit events to the local syslog daemon instead of stderr.
    #[arg(long, env = "SQUID_YT_SYSLOG", conflicts_with = "audit_log")]
    pub syslog: bool,
    /// Syslog datagram socket used with `--syslog`.
    #[arg(long, env = "SQUID_YT_SYSLOG_SOCKET", default_value = DEFAULT_SYSLOG_SOCKET)]
    pub syslog_socket: PathBuf,
}

impl GateArgs {
    /// Validates settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.good_bad_rate > 100 {
            return Err(ConfigError::Invalid("good-bad-rate must be between 0 and 100".to_string()));
        }
        if self.limit_minutes > MAX_LIMIT_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "limit-minutes must be at most {MAX_LIMIT_MINUTES}"
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout-ms must be greater than zero".to_string()));
        }
        if self.provider_marker.trim().is_empty() {
            return Err(ConfigError::Invalid("provider-marker must not be empty".to_string()));
        }
        if self.content_param.trim().is_empty() {
            return Err(ConfigError::Invalid("content-param must not be empty".to_string()));
        }
        if self.state_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("state-path must not be empty".to_string()));
        }
        validate_http_url("safe-url", &self.safe_url)?;
        if self.metadata_enabled() {
            validate_http_url("metadata-endpoint", &self.metadata_endpoint)?;
        }
        Ok(())
    }

    /// Returns true when an API key is configured.
    #[must_use]
    pub fn metadata_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Returns the quality gate thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> QualityThresholds {
        QualityThresholds {
            min_views: self.view_low_watermark,
            min_good_ratio: self.good_bad_rate,
        }
    }

    /// Returns the metadata client config, or `None` when lookups are disabled.
    #[must_use]
    pub fn metadata_config(&self) -> Option<YouTubeMetadataConfig> {
        self.metadata_enabled().then(|| YouTubeMetadataConfig {
            endpoint: self.metadata_endpoint.clone(),
            timeout_ms: self.timeout_ms,
            ..YouTubeMetadataConfig::new(self.api_key.trim())
        })
    }

    /// Returns the quota store config.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig::new(self.state_path.clone())
    }

    /// Returns the protocol loop config.
    #[must_use]
    pub fn redirector_config(&self) -> RedirectorConfig {
        RedirectorConfig {
            provider_marker: self.provider_marker.trim().to_ascii_lowercase(),
            content_param: self.content_param.trim().to_string(),
            safe_url: self.safe_url.clone(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures `value` parses as an absolute `http` or `https` URL.
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|_| ConfigError::Invalid(format!("{name} must be an absolute url")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{name} must be an http or https url")));
    }
    if value.contains('"') {
        return Err(ConfigError::Invalid(format!("{name} must not contain quotes")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

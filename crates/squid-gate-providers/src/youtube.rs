// crates/squid-gate-providers/src/youtube.rs
// ============================================================================
// Module: YouTube Metadata Client
// Description: Metadata source backed by the YouTube Data API videos endpoint.
// Purpose: Fetch title and popularity counters for a video identifier.
// Dependencies: squid-gate-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The YouTube client issues one bounded GET per lookup against the `videos`
//! endpoint, asking only for the `snippet` and `statistics` parts. Redirects
//! are not followed and response bodies are capped. Failures are reported as
//! typed [`MetadataError`] values; the default [`MetadataSource::fetch`] folds
//! them into an unresolved lookup.
//!
//! Counters arrive as decimal strings from the live API; plain JSON numbers
//! are accepted too. A missing counter reads as zero (the API omits
//! `dislikeCount` for most videos), while a missing `statistics` object is a
//! decode failure.
//! Invariants:
//! - The API key never appears in errors or debug output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Deserializer;
use squid_gate_core::ContentId;
use squid_gate_core::MetadataError;
use squid_gate_core::MetadataRecord;
use squid_gate_core::MetadataSource;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default YouTube Data API videos endpoint.
pub const DEFAULT_METADATA_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default response size cap in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 256 * 1024;

/// Configuration for the YouTube metadata client.
///
/// # Invariants
/// - `endpoint` must be an `http` or `https` URL without embedded credentials.
/// - `api_key` must be non-empty.
/// - `timeout_ms` applies to the full request lifecycle.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Clone, PartialEq, Eq)]
pub struct YouTubeMetadataConfig {
    /// Videos endpoint URL.
    pub endpoint: String,
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl YouTubeMetadataConfig {
    /// Creates a configuration for the default endpoint with `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl Default for YouTubeMetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            api_key: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("squid-gate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl fmt::Debug for YouTubeMetadataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YouTubeMetadataConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Metadata source backed by the YouTube Data API.
///
/// # Invariants
/// - Redirects are not followed.
/// - Responses exceeding configured limits fail closed.
pub struct YouTubeMetadataClient {
    /// Validated endpoint URL.
    endpoint: Url,
    /// API key sent with every request.
    api_key: String,
    /// Maximum response size allowed, in bytes.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl YouTubeMetadataClient {
    /// Creates a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Config`] when the endpoint or key is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: YouTubeMetadataConfig) -> Result<Self, MetadataError> {
        let endpoint = validate_endpoint(&config.endpoint)?;
        if config.api_key.trim().is_empty() {
            return Err(MetadataError::Config("api key is required".to_string()));
        }
        if config.timeout_ms == 0 {
            return Err(MetadataError::Config("timeout must be greater than zero".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent)
            .redirect(Policy::none())
            .build()
            .map_err(|_| MetadataError::Config("http client build failed".to_string()))?;
        Ok(Self {
            endpoint,
            api_key: config.api_key,
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Returns the endpoint this client queries.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the request URL for `content_id`.
    fn request_url(&self, content_id: &ContentId) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("part", "snippet,statistics")
            .append_pair("id", content_id.as_str())
            .append_pair("fields", "items/statistics,items/snippet")
            .append_pair("key", &self.api_key);
        url
    }
}

impl MetadataSource for YouTubeMetadataClient {
    fn try_fetch(&self, content_id: &ContentId) -> Result<MetadataRecord, MetadataError> {
        let url = self.request_url(content_id);
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| MetadataError::Transport(err.without_url().to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status.as_u16()));
        }
        let body = read_response_limited(&mut response, self.max_response_bytes)?;
        let payload: VideoListResponse =
            serde_json::from_slice(&body).map_err(|err| MetadataError::Decode(err.to_string()))?;
        payload
            .items
            .into_iter()
            .next()
            .map(VideoItem::into_record)
            .ok_or_else(|| MetadataError::NotFound(content_id.to_string()))
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// `videos.list` response body.
#[derive(Deserialize)]
struct VideoListResponse {
    /// Matching videos; empty when the id is unknown.
    #[serde(default)]
    items: Vec<VideoItem>,
}

/// One video resource.
#[derive(Deserialize)]
struct VideoItem {
    /// Snippet part.
    snippet: VideoSnippet,
    /// Statistics part.
    statistics: VideoStatistics,
}

impl VideoItem {
    /// Converts the wire resource into a metadata record.
    fn into_record(self) -> MetadataRecord {
        MetadataRecord {
            title: self.snippet.title,
            view_count: self.statistics.view_count,
            like_count: self.statistics.like_count,
            dislike_count: self.statistics.dislike_count,
        }
    }
}

/// Snippet part of a video resource.
#[derive(Deserialize)]
struct VideoSnippet {
    /// Video title.
    #[serde(default)]
    title: String,
}

/// Statistics part of a video resource.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    /// Total views.
    #[serde(default, deserialize_with = "deserialize_count")]
    view_count: u64,
    /// Total likes.
    #[serde(default, deserialize_with = "deserialize_count")]
    like_count: u64,
    /// Total dislikes.
    #[serde(default, deserialize_with = "deserialize_count")]
    dislike_count: u64,
}

/// Counter encodings seen on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum CountRepr {
    /// Plain JSON number.
    Number(u64),
    /// Decimal string, as the live API sends.
    Text(String),
}

/// Deserializes a counter from a number, a decimal string, or null.
fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<CountRepr>::deserialize(deserializer)? {
        None => Ok(0),
        Some(CountRepr::Number(value)) => Ok(value),
        Some(CountRepr::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid counter value: {text}"))),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and validates the configured endpoint.
fn validate_endpoint(raw: &str) -> Result<Url, MetadataError> {
    let url =
        Url::parse(raw).map_err(|_| MetadataError::Config("invalid endpoint url".to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MetadataError::Config("unsupported endpoint scheme".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(MetadataError::Config("endpoint credentials are not allowed".to_string()));
    }
    if url.host_str().is_none() {
        return Err(MetadataError::Config("endpoint host required".to_string()));
    }
    Ok(url)
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, MetadataError> {
    let too_large = || MetadataError::TooLarge {
        max_bytes,
    };
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| MetadataError::Config("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(too_large());
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| MetadataError::Transport("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(too_large());
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions."
    )]

    use super::*;

    #[test]
    fn config_debug_redacts_api_key() {
        let config = YouTubeMetadataConfig::new("secret-key");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn request_url_carries_expected_parameters() {
        let client = YouTubeMetadataClient::new(YouTubeMetadataConfig::new("k1")).unwrap();
        let url = client.request_url(&ContentId::new("ABC123"));
        let pairs: Vec<(String, String)> =
            url.query_pairs().map(|(key, value)| (key.into_owned(), value.into_owned())).collect();
        assert_eq!(
            pairs,
            vec![
                ("part".to_string(), "snippet,statistics".to_string()),
                ("id".to_string(), "ABC123".to_string()),
                ("fields".to_string(), "items/statistics,items/snippet".to_string()),
                ("key".to_string(), "k1".to_string()),
            ]
        );
    }

    #[test]
    fn invalid_endpoints_are_rejected() {
        for endpoint in ["ftp://example.com/videos", "not a url", "https://user:pw@example.com/"] {
            let config = YouTubeMetadataConfig {
                endpoint: endpoint.to_string(),
                ..YouTubeMetadataConfig::new("k1")
            };
            assert!(matches!(YouTubeMetadataClient::new(config), Err(MetadataError::Config(_))));
        }
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = YouTubeMetadataClient::new(YouTubeMetadataConfig::new("  "));
        assert!(matches!(result, Err(MetadataError::Config(_))));
    }

    #[test]
    fn statistics_accept_strings_numbers_and_gaps() {
        let payload: VideoListResponse = serde_json::from_str(
            r#"{"items":[{"snippet":{"title":"clip"},
                "statistics":{"viewCount":"2000","likeCount":80}}]}"#,
        )
        .unwrap();
        let record = payload.items.into_iter().next().unwrap().into_record();
        assert_eq!(record.view_count, 2_000);
        assert_eq!(record.like_count, 80);
        assert_eq!(record.dislike_count, 0);
    }

    #[test]
    fn non_numeric_counter_is_a_decode_failure() {
        let result: Result<VideoListResponse, _> = serde_json::from_str(
            r#"{"items":[{"snippet":{"title":"clip"},"statistics":{"viewCount":"lots"}}]}"#,
        );
        assert!(result.is_err());
    }
}

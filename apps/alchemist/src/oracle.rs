//! # Oracle Client
//!
//! One request per pair against the external combination service.
//!
//! The client never retries: a refusal is reported to the caller, and any
//! backoff or identity rotation happens by restarting the process.

use crate::config::OracleConfig;
use crate::error::DiscoveryError;
use async_trait::async_trait;
use reqwest::header::{DATE, HeaderMap, HeaderValue, REFERER};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Format of the client-side request timestamp (RFC 1123, always GMT).
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Errors from the oracle layer. All of them are fatal to the agent.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle answered with a rejecting status (notably 403).
    #[error("Oracle refused the request ({status}): {url}")]
    Refused { status: u16, url: String },

    /// No HTTP response was received.
    #[error("Cannot reach the oracle at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The response body is not a valid combination result.
    #[error("Malformed oracle response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OracleResult {
    /// The produced element name.
    pub result: String,
    /// Decorative emoji.
    #[serde(default)]
    pub emoji: Option<String>,
    /// Whether this was a first-ever discovery on the oracle's side.
    #[serde(default, rename = "isNew")]
    pub is_new: bool,
}

/// What was sent and what came back, for the metrics log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMetadata {
    /// The exact URL requested.
    pub url: String,
    /// HTTP status received.
    pub http_status: u16,
    /// Client clock at request time.
    pub requested_at: String,
    /// Server clock from the `Date` header.
    pub responded_at: Option<String>,
}

/// A successful oracle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleReply {
    pub result: OracleResult,
    pub call: CallMetadata,
}

/// The combination service.
///
/// Input order is passed through untouched: the upstream may treat
/// `(a, b)` and `(b, a)` as distinct requests.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Ask the oracle what `a` and `b` combine into.
    async fn combine(&self, a: &str, b: &str) -> Result<OracleReply, OracleError>;
}

/// Decode a response body, rejecting anything without a usable `result`.
pub fn decode_result(url: &str, body: &[u8]) -> Result<OracleResult, OracleError> {
    let decoded: OracleResult =
        serde_json::from_slice(body).map_err(|e| OracleError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    if decoded.result.is_empty() {
        return Err(OracleError::Malformed {
            url: url.to_string(),
            reason: "empty `result` field".to_string(),
        });
    }
    Ok(decoded)
}

// =============================================================================
// HTTP ORACLE
// =============================================================================

/// reqwest-backed oracle client.
///
/// HTTP/2 stays negotiable: the service refuses HTTP/1.1-only clients, so
/// the client must never be built with `http1_only`.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpOracle {
    /// Build a client from configuration.
    pub fn new(config: &OracleConfig) -> Result<Self, DiscoveryError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DiscoveryError::Config(format!("Invalid oracle URL '{}': {}", config.base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(&config.referer).map_err(|e| {
            DiscoveryError::Config(format!("Invalid referer '{}': {}", config.referer, e))
        })?;
        headers.insert(REFERER, referer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DiscoveryError::Config(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// The URL requested for the pair `(a, b)`.
    #[must_use]
    pub fn pair_url(&self, a: &str, b: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("first", a)
            .append_pair("second", b);
        url
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn combine(&self, a: &str, b: &str) -> Result<OracleReply, OracleError> {
        let url = self.pair_url(a, b);
        let url_text = url.to_string();

        let requested_at = chrono::Utc::now().format(HTTP_DATE_FORMAT).to_string();
        tracing::debug!(url = %url_text, "Calling oracle");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| OracleError::Unreachable {
                url: url_text.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        tracing::debug!(status = status.as_u16(), "Oracle responded");
        if !status.is_success() {
            return Err(OracleError::Refused {
                status: status.as_u16(),
                url: url_text,
            });
        }

        let responded_at = resp
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = resp.bytes().await.map_err(|e| OracleError::Unreachable {
            url: url_text.clone(),
            reason: e.to_string(),
        })?;
        let result = decode_result(&url_text, &body)?;

        Ok(OracleReply {
            result,
            call: CallMetadata {
                url: url_text,
                http_status: status.as_u16(),
                requested_at,
                responded_at,
            },
        })
    }
}

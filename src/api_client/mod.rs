//! ApiClient - CamouSense Backend Adapter
//!
//! ## Responsibilities
//!
//! - Pre-flight connectivity probe against the IP Webcam diagnostic surface
//! - Single-frame fetch through the backend frame proxy
//! - Detection submission (multipart upload, history suppressed)
//! - Bearer credential attachment on every outgoing call

use crate::error::{Error, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Bounded wait for the connectivity probe. The backend runs its own
/// sequential per-endpoint sub-probes before answering, so this must
/// exceed their combined wait or the diagnostics report is lost.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded wait for one frame fetch
const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for one detection call
const DETECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of probing a single IP Webcam endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Probed endpoint path (e.g. "/shot.jpg")
    pub endpoint: String,

    /// Full URL that was probed
    #[serde(default)]
    pub url: Option<String>,

    /// HTTP status returned, absent on transport failure
    #[serde(default)]
    pub status: Option<u16>,

    /// Whether the probe succeeded
    #[serde(default)]
    pub success: bool,

    /// Payload size in bytes on success
    #[serde(default)]
    pub size: Option<u64>,

    /// Error message on failure
    #[serde(default)]
    pub error: Option<String>,
}

/// Diagnostics report from the pre-flight connectivity test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// Device address that was tested
    pub ip: String,

    /// Overall status flag ("success" or "error")
    #[serde(default)]
    pub status: String,

    /// Human-readable summary from the backend
    #[serde(default)]
    pub message: Option<String>,

    /// Ordered per-endpoint probe results
    #[serde(default)]
    pub tests: Vec<ProbeResult>,
}

impl DiagnosticsReport {
    /// Overall probe success
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Probe entries that carry an error, in report order
    pub fn failures(&self) -> Vec<&ProbeResult> {
        self.tests.iter().filter(|t| t.error.is_some()).collect()
    }

    /// Troubleshooting lines surfaced to the user on failure
    pub fn troubleshooting(&self) -> Vec<String> {
        self.failures()
            .iter()
            .map(|t| {
                format!(
                    "{}: {}",
                    t.endpoint,
                    t.error.as_deref().unwrap_or("Failed")
                )
            })
            .collect()
    }
}

/// Detection response from the backend upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Annotated frame as base64-encoded JPEG
    pub image: String,

    /// Detected label strings (may contain duplicates)
    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Abstraction over the backend calls the poller depends on.
///
/// Lets the detection loop run against a scripted backend in tests.
#[async_trait::async_trait]
pub trait CameraBackend: Send + Sync {
    /// Pre-flight connectivity probe for a device address
    async fn test_connection(&self, ip: &str) -> Result<DiagnosticsReport>;

    /// Fetch one raw JPEG frame for a device address
    async fn fetch_frame(&self, ip: &str) -> Result<Vec<u8>>;

    /// Run detection on one frame without persisting it to history
    async fn detect(&self, frame: Vec<u8>) -> Result<DetectResponse>;
}

/// CamouSense backend HTTP client
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    /// Bearer credential shared with whoever manages login state
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create new API client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the bearer credential attached to subsequent calls
    pub async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    /// Clear the bearer credential (requests proceed unauthenticated)
    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attach the bearer credential if one is present.
    /// Absence is tolerated; the backend may still reject with 401.
    async fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Map a transport-level reqwest failure into the error taxonomy
    fn transport_error(context: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(format!("{}: {}", context, e))
        } else if e.is_connect() {
            Error::Network(format!("{}: backend unreachable ({})", context, e))
        } else {
            Error::Http(e)
        }
    }

    /// Map a non-success HTTP status into the error taxonomy
    fn status_error(context: &str, status: StatusCode) -> Error {
        match status {
            StatusCode::UNAUTHORIZED => {
                Error::Unauthorized(format!("{}: session expired", context))
            }
            StatusCode::BAD_GATEWAY => {
                Error::UpstreamLost(format!("{}: remote camera unreachable", context))
            }
            _ => Error::Api(format!("{}: {}", context, status)),
        }
    }
}

#[async_trait::async_trait]
impl CameraBackend for ApiClient {
    async fn test_connection(&self, ip: &str) -> Result<DiagnosticsReport> {
        let url = format!("{}/ipwebcam/test", self.base_url);
        let req = self
            .client
            .get(&url)
            .query(&[("ip", ip)])
            .timeout(PROBE_TIMEOUT);

        let resp = self
            .with_auth(req)
            .await
            .send()
            .await
            .map_err(|e| Self::transport_error("connectivity test", e))?;

        if !resp.status().is_success() {
            return Err(Self::status_error("connectivity test", resp.status()));
        }

        let report: DiagnosticsReport = resp.json().await?;

        tracing::debug!(
            ip = %report.ip,
            status = %report.status,
            probes = report.tests.len(),
            "Connectivity test completed"
        );

        Ok(report)
    }

    async fn fetch_frame(&self, ip: &str) -> Result<Vec<u8>> {
        let url = format!("{}/ipwebcam/frame", self.base_url);
        let req = self
            .client
            .get(&url)
            .query(&[("ip", ip)])
            .timeout(FRAME_TIMEOUT);

        let resp = self
            .with_auth(req)
            .await
            .send()
            .await
            .map_err(|e| Self::transport_error("frame fetch", e))?;

        if !resp.status().is_success() {
            return Err(Self::status_error("frame fetch", resp.status()));
        }

        let bytes = resp.bytes().await?;

        tracing::debug!(ip = %ip, size = bytes.len(), "Frame fetched via proxy");

        Ok(bytes.to_vec())
    }

    async fn detect(&self, frame: Vec<u8>) -> Result<DetectResponse> {
        let url = format!("{}/upload", self.base_url);

        let form = Form::new().part(
            "file",
            Part::bytes(frame)
                .file_name("frame.jpg")
                .mime_str("image/jpeg")?,
        );

        let req = self
            .client
            .post(&url)
            .query(&[("save_history", "false")])
            .multipart(form)
            .timeout(DETECT_TIMEOUT);

        let resp = self
            .with_auth(req)
            .await
            .send()
            .await
            .map_err(|e| Self::transport_error("detection", e))?;

        if !resp.status().is_success() {
            return Err(Self::status_error("detection", resp.status()));
        }

        let result: DetectResponse = resp.json().await?;

        tracing::debug!(labels = result.labels.len(), "Detection completed");

        Ok(result)
    }
}

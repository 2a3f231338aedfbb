//! Application configuration

use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// CamouSense backend base URL
    pub backend_url: String,
    /// IP Webcam device address (dotted-quad, no scheme or port)
    pub device_address: Option<String>,
    /// Bearer token for authenticated calls (optional)
    pub api_token: Option<String>,
    /// Polling period in milliseconds
    pub poll_interval_ms: u64,
    /// Consecutive-error threshold before the session is lost
    pub error_threshold: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            device_address: std::env::var("DEVICE_ADDRESS").ok(),
            api_token: std::env::var("API_TOKEN").ok(),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            error_threshold: std::env::var("ERROR_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

impl AppConfig {
    /// Derive the poller settings from this configuration
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            period: Duration::from_millis(self.poll_interval_ms),
            error_threshold: self.error_threshold,
        }
    }
}

/// Poller settings
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Fixed tick period of the detection loop
    pub period: Duration,
    /// Consecutive failures that force the session into Lost
    pub error_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1000),
            error_threshold: 5,
        }
    }
}

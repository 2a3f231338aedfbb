//! CamouSense Live - live camera detection runner
//!
//! Connects to a configured IP Webcam device through the CamouSense
//! backend, runs the detection polling loop, and logs display updates
//! until interrupted.

use camousense_live::{
    api_client::ApiClient,
    config::AppConfig,
    display::DisplayState,
    notice_log::NoticeLog,
    poller::LivePoller,
    session::ConnectionState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camousense_live=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CamouSense Live v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        backend_url = %config.backend_url,
        poll_interval_ms = config.poll_interval_ms,
        error_threshold = config.error_threshold,
        "Configuration loaded"
    );

    let address = config
        .device_address
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DEVICE_ADDRESS not set"))?;

    // Initialize components
    let api_client = Arc::new(ApiClient::new(config.backend_url.clone()));
    if let Some(ref token) = config.api_token {
        api_client.set_token(token.clone()).await;
        tracing::info!("Bearer credential configured");
    }

    let display = Arc::new(DisplayState::new());
    let notices = Arc::new(NoticeLog::default());
    let poller = Arc::new(LivePoller::new(
        api_client,
        display.clone(),
        notices.clone(),
        config.poller_config(),
    ));
    tracing::info!("LivePoller initialized");

    // Pre-flight connectivity probe
    let report = poller.connect(&address).await?;
    if !report.is_success() {
        for line in report.troubleshooting() {
            tracing::error!(probe = %line, "Connectivity diagnostics");
        }
        anyhow::bail!("IP Webcam at {} is not reachable", address);
    }

    poller.start_detection().await?;
    tracing::info!(address = %address, "Detection started");

    // Report display state periodically until Ctrl-C or the session ends
    let status_poller = poller.clone();
    let status_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;

            let state = status_poller.session_state().await;
            let snapshot = status_poller.display().snapshot().await;
            tracing::info!(
                state = ?state,
                fps = snapshot.fps,
                labels = ?snapshot.labels,
                connection_lost = snapshot.connection_lost,
                "Live status"
            );

            if matches!(
                state,
                ConnectionState::Lost | ConnectionState::Disconnected
            ) {
                break;
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping camera");
        }
        _ = status_task => {
            tracing::warn!("Session ended");
        }
    }

    poller.stop_camera().await;

    for notice in notices.latest(5).await {
        tracing::info!(kind = ?notice.kind, message = %notice.message, "Notice");
    }

    Ok(())
}

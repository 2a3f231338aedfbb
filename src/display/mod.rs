//! Display State - Labels, Frame Rate, Render Surface
//!
//! ## Responsibilities
//!
//! - Hold the label set and annotated frame from the latest detection cycle
//! - Rolling frames-per-second computation (1-second window)
//! - Offscreen render surface sized to the annotated frame
//!
//! Owned exclusively by the poller; mutated only from cycle-completion
//! paths. User actions merely start/stop the loop or clear the state.

use crate::error::{Error, Result};
use base64::Engine;
use image::RgbaImage;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Offscreen drawable surface holding the decoded annotated frame.
///
/// Each presentation replaces the prior contents entirely and resizes the
/// surface to the image's native dimensions.
#[derive(Default)]
pub struct RenderSurface {
    frame: Option<RgbaImage>,
}

impl RenderSurface {
    /// Decode a base64-encoded JPEG and replace the surface contents.
    /// Returns the native dimensions of the decoded image.
    pub fn present_base64(&mut self, b64_jpeg: &str) -> Result<(u32, u32)> {
        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(b64_jpeg)
            .map_err(|e| Error::Decode(format!("annotated frame base64: {}", e)))?;

        let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)
            .map_err(|e| Error::Decode(format!("annotated frame JPEG: {}", e)))?
            .to_rgba8();

        let dims = decoded.dimensions();
        self.frame = Some(decoded);
        Ok(dims)
    }

    /// Clear the surface
    pub fn clear(&mut self) {
        self.frame = None;
    }

    /// Whether the surface currently holds a frame
    pub fn is_blank(&self) -> bool {
        self.frame.is_none()
    }

    /// Native dimensions of the presented frame, if any
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| f.dimensions())
    }
}

/// Rolling frames-per-second counter.
///
/// Increments per rendered frame; once at least one second has elapsed
/// since the window start, the published rate becomes the counted frames
/// and a new window begins. The rate never updates more than once per
/// second regardless of cycle period.
pub struct FrameRateCounter {
    frames: u32,
    window_start: Instant,
}

impl FrameRateCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            window_start: Instant::now(),
        }
    }

    /// Record one rendered frame at `now`. Returns the new published rate
    /// when the 1-second window has elapsed, None otherwise.
    pub fn record(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;

        if now.duration_since(self.window_start).as_millis() >= 1000 {
            let rate = self.frames;
            self.frames = 0;
            self.window_start = now;
            Some(rate)
        } else {
            None
        }
    }

    /// Reset the counter and start a fresh window
    pub fn reset(&mut self) {
        self.frames = 0;
        self.window_start = Instant::now();
    }
}

impl Default for FrameRateCounter {
    fn default() -> Self {
        Self::new()
    }
}

struct DisplayInner {
    /// Labels from the latest cycle, as returned (duplicates possible)
    labels: Vec<String>,
    /// Published frames-per-second value
    fps: u32,
    /// Connectivity indicator escalated on gateway-style failures
    connection_lost: bool,
    surface: RenderSurface,
    fps_counter: FrameRateCounter,
}

/// Read-only view of the display for UI rendering and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    /// Deduplicated labels in first-seen order
    pub labels: Vec<String>,
    pub fps: u32,
    pub connection_lost: bool,
    pub frame_dimensions: Option<(u32, u32)>,
}

/// Shared display state for the live camera screen
pub struct DisplayState {
    inner: RwLock<DisplayInner>,
}

impl DisplayState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DisplayInner {
                labels: Vec::new(),
                fps: 0,
                connection_lost: false,
                surface: RenderSurface::default(),
                fps_counter: FrameRateCounter::new(),
            }),
        }
    }

    /// Apply one successful cycle: replace labels, present the annotated
    /// frame, and advance the frame-rate window.
    pub async fn apply_cycle(&self, labels: Vec<String>, annotated_b64: &str) -> Result<()> {
        let mut inner = self.inner.write().await;

        let dims = inner.surface.present_base64(annotated_b64)?;
        inner.labels = labels;
        inner.connection_lost = false;

        if let Some(rate) = inner.fps_counter.record(Instant::now()) {
            inner.fps = rate;
        }

        tracing::debug!(
            width = dims.0,
            height = dims.1,
            labels = inner.labels.len(),
            "Annotated frame rendered"
        );

        Ok(())
    }

    /// Escalate the connectivity indicator without clearing the frame
    pub async fn mark_connection_lost(&self) {
        self.inner.write().await.connection_lost = true;
    }

    /// Reset labels, frame rate, indicator, and surface to initial values
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.labels.clear();
        inner.fps = 0;
        inner.connection_lost = false;
        inner.surface.clear();
        inner.fps_counter.reset();
    }

    /// Deduplicated labels in first-seen order, for display
    pub async fn unique_labels(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut seen = Vec::new();
        for label in &inner.labels {
            if !seen.contains(label) {
                seen.push(label.clone());
            }
        }
        seen
    }

    /// Published frames-per-second value
    pub async fn fps(&self) -> u32 {
        self.inner.read().await.fps
    }

    /// Snapshot of the display for UI rendering and tests
    pub async fn snapshot(&self) -> DisplaySnapshot {
        let labels = self.unique_labels().await;
        let inner = self.inner.read().await;
        DisplaySnapshot {
            labels,
            fps: inner.fps,
            connection_lost: inner.connection_lost,
            frame_dimensions: inner.surface.dimensions(),
        }
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new()
    }
}

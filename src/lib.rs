//! CamouSense Live - Camera Detection Poller
//!
//! Client-side engine for the CamouSense live camera screen.
//!
//! ## Architecture (5 Components)
//!
//! 1. ApiClient - CamouSense backend HTTP adapter (probe / frame proxy / detection)
//! 2. Session - Per-connection state machine and failure accounting
//! 3. LivePoller - Timer-driven fetch-and-detect cycles
//! 4. DisplayState - Labels, frame rate, annotated render surface
//! 5. NoticeLog - User-facing notices (ring buffer)
//!
//! ## Design Principles
//!
//! - One explicit Session per connection, constructed on connect, discarded on stop
//! - Cycles are strictly sequential; a tick never overlaps an in-flight cycle
//! - All network failures are absorbed at the cycle boundary, never propagated

pub mod api_client;
pub mod config;
pub mod display;
pub mod error;
pub mod notice_log;
pub mod poller;
pub mod session;

pub use error::{Error, Result};

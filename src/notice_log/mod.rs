//! NoticeLog - User-Facing Notices (Ring Buffer)
//!
//! ## Responsibilities
//!
//! - Store notices the UI must surface to the user
//! - Keep transient failures out of the user's face (those stay at log level)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Why the user is being notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    /// Pre-flight probe failed; user must retry after troubleshooting
    ProbeFailed,
    /// Error threshold crossed; session is lost until restarted
    ConnectionLost,
    /// Backend rejected the credential; user must log in again
    SessionExpired,
}

/// One user-facing notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub notice_id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Ring buffer for notices
struct NoticeRingBuffer {
    notices: VecDeque<Notice>,
    capacity: usize,
    next_id: u64,
}

impl NoticeRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            notices: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, kind: NoticeKind, message: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        if self.notices.len() >= self.capacity {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            notice_id: id,
            kind,
            message,
            created_at: Utc::now(),
        });
        id
    }
}

/// NoticeLog instance
pub struct NoticeLog {
    buffer: RwLock<NoticeRingBuffer>,
}

impl NoticeLog {
    /// Create new NoticeLog
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(NoticeRingBuffer::new(capacity)),
        }
    }

    /// Add a notice
    pub async fn push(&self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        let message = message.into();
        let mut buffer = self.buffer.write().await;
        let id = buffer.push(kind, message.clone());
        tracing::info!(notice_id = id, kind = ?kind, message = %message, "User notice");
        id
    }

    /// Get latest notices, newest first
    pub async fn latest(&self, count: usize) -> Vec<Notice> {
        let buffer = self.buffer.read().await;
        buffer.notices.iter().rev().take(count).cloned().collect()
    }

    /// Get notices of one kind, newest first
    pub async fn of_kind(&self, kind: NoticeKind) -> Vec<Notice> {
        let buffer = self.buffer.read().await;
        buffer
            .notices
            .iter()
            .rev()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    /// Get notice count
    pub async fn count(&self) -> usize {
        let buffer = self.buffer.read().await;
        buffer.notices.len()
    }
}

impl Default for NoticeLog {
    fn default() -> Self {
        Self::new(100)
    }
}

use std::time::Instant;

use crate::options::StreamOptions;
use crate::window::WindowHandle;

/// Lifecycle of a [`StreamSession`] (spec.md §4.6.3).
///
/// `Active -> Draining -> Closed`, never reused once `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Active,
    Draining,
    Closed,
}

/// Server-side bookkeeping for one streaming connection.
///
/// Owned exclusively by the session that created it; never shared across
/// sessions (spec.md §3 Ownership).
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub id: String,
    pub target: WindowHandle,
    pub options: StreamOptions,
    pub state: SessionState,
    pub started_at: Instant,
    pub frame_count: u64,
    pub bytes_sent: u64,
    pub last_frame_at: Option<Instant>,
}

impl StreamSession {
    pub fn new(id: String, target: WindowHandle, options: StreamOptions) -> Self {
        Self {
            id,
            target,
            options,
            state: SessionState::Initializing,
            started_at: Instant::now(),
            frame_count: 0,
            bytes_sent: 0,
            last_frame_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// Point-in-time copy returned by `list_active`; not a live view (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub target: WindowHandle,
    pub options: StreamOptions,
    pub active: bool,
    pub frame_count: u64,
    pub bytes_sent: u64,
    pub duration_ms: u64,
}

impl From<&StreamSession> for SessionSummary {
    fn from(s: &StreamSession) -> Self {
        Self {
            id: s.id.clone(),
            target: s.target,
            options: s.options,
            active: s.is_active(),
            frame_count: s.frame_count,
            bytes_sent: s.bytes_sent,
            duration_ms: s.uptime().as_millis() as u64,
        }
    }
}

/// Aggregate counters returned by `SessionManager::stats` (spec.md §4.6).
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionManagerStats {
    pub active_count: usize,
    pub total_count_since_start: u64,
    pub total_frames: u64,
    pub uptime: std::time::Duration,
}

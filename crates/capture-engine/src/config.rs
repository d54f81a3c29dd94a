use std::time::Duration;

/// Tunables for the capture engine that spec.md leaves as constants but a
/// real deployment wants to adjust (e.g. a slower compositor under load).
///
/// Not a file-backed config layer — persistent configuration is the host's
/// concern (spec.md §1 Non-goals) — just a `Default`-implementing struct
/// threaded through at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Fixed backoff between per-method retries (spec.md §4.3.2).
    pub retry_backoff: Duration,
    /// Gap between methods in the fallback chain (spec.md §4.3.2).
    pub method_gap: Duration,
    /// Upper bound on the compositor-thumbnail render wait (spec.md §4.3.2).
    pub compositor_render_timeout: Duration,
    /// Consecutive `WindowNotFound` ticks before a stream session is torn
    /// down as fatal (spec.md §4.6.3).
    pub fatal_window_not_found_ticks: u32,
    /// How often a per-session capture warning is allowed to repeat
    /// (spec.md §4.6.1: "emit a single per-minute warning message").
    pub capture_warning_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_millis(100),
            method_gap: Duration::from_millis(100),
            compositor_render_timeout: Duration::from_millis(150),
            fatal_window_not_found_ticks: 10,
            capture_warning_interval: Duration::from_secs(60),
        }
    }
}

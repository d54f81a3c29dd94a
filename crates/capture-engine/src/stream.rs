//! C6: Streaming Session Manager (spec.md §4.6). Transport-agnostic: the
//! host hands the manager a connection implementing [`Transport`]; from
//! that point the manager owns it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime};

use capture_proto::{
    CaptureError, CaptureResult, ClientCommand, FrameMessage, ServerMessage, SessionManagerStats, SessionState,
    SessionStatus, SessionSummary, StreamOptions, StreamOptionsPatch, WindowHandle,
};

use crate::codec::Codec;
use crate::config::EngineConfig;
use crate::engine::{default_stream_capture_options, CaptureEngine};

/// The host-provided connection a session streams over. One frame channel
/// (`send`) and one control channel (`recv`), both JSON.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: ServerMessage) -> CaptureResult<()>;
    /// `Ok(None)` means the peer closed the connection normally.
    async fn recv(&self) -> CaptureResult<Option<serde_json::Value>>;
}

struct SessionInner {
    id: String,
    target: WindowHandle,
    options: Mutex<StreamOptions>,
    state: Mutex<SessionState>,
    started_at: Instant,
    frame_count: AtomicU64,
    bytes_sent: AtomicU64,
    shutdown: tokio::sync::watch::Sender<bool>,
    transport: Arc<dyn Transport>,
}

impl SessionInner {
    fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            target: self.target,
            options: *self.options.lock().unwrap(),
            active: *self.state.lock().unwrap() == SessionState::Active,
            frame_count: self.frame_count.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            duration_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

pub struct SessionManager {
    engine: Arc<CaptureEngine>,
    codec: Arc<Codec>,
    config: EngineConfig,
    sessions: RwLock<HashMap<String, Arc<SessionInner>>>,
    next_session_seq: AtomicU64,
    total_sessions_started: AtomicU64,
    total_frames_sent: Arc<AtomicU64>,
    manager_started_at: Instant,
}

impl SessionManager {
    pub fn new(engine: Arc<CaptureEngine>, codec: Arc<Codec>, config: EngineConfig) -> Self {
        Self {
            engine,
            codec,
            config,
            sessions: RwLock::new(HashMap::new()),
            next_session_seq: AtomicU64::new(1),
            total_sessions_started: AtomicU64::new(0),
            total_frames_sent: Arc::new(AtomicU64::new(0)),
            manager_started_at: Instant::now(),
        }
    }

    fn total_frames_sent_handle(&self) -> Arc<AtomicU64> {
        self.total_frames_sent.clone()
    }

    /// Allocates a session, sends `session_started` as the first frame on
    /// the channel, and spawns its capture loop and control reader.
    pub async fn start_session(&self, handle: WindowHandle, options: StreamOptions, transport: Arc<dyn Transport>) -> CaptureResult<String> {
        let mut options = options;
        options.clamp();

        let seq = self.next_session_seq.fetch_add(1, Ordering::Relaxed);
        let id = format!("sess-{seq}");
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let inner = Arc::new(SessionInner {
            id: id.clone(),
            target: handle,
            options: Mutex::new(options),
            state: Mutex::new(SessionState::Active),
            started_at: Instant::now(),
            frame_count: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            shutdown: shutdown_tx,
            transport: transport.clone(),
        });

        transport
            .send(ServerMessage::SessionStarted { session_id: id.clone(), options })
            .await?;

        self.sessions.write().unwrap().insert(id.clone(), inner.clone());
        self.total_sessions_started.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(capture_loop(
            inner.clone(),
            self.engine.clone(),
            self.codec.clone(),
            self.config,
            shutdown_rx.clone(),
            self.total_frames_sent_handle(),
        ));
        tokio::spawn(control_reader(inner, shutdown_rx));

        Ok(id)
    }

    /// Idempotent: stopping an unknown or already-stopped session is not an error.
    pub fn stop_session(&self, id: &str) -> CaptureResult<()> {
        if let Some(inner) = self.sessions.write().unwrap().remove(id) {
            *inner.state.lock().unwrap() = SessionState::Draining;
            let _ = inner.shutdown.send(true);
        }
        Ok(())
    }

    /// Sparse update: only fields present in `patch` override. Applied
    /// atomically under the session's options lock before the next tick.
    pub async fn update_session(&self, id: &str, patch: StreamOptionsPatch) -> CaptureResult<()> {
        let inner = self.sessions.read().unwrap().get(id).cloned().ok_or(CaptureError::InvalidArgument(format!("unknown session {id}")))?;
        let updated = {
            let mut opts = inner.options.lock().unwrap();
            opts.merge(&patch);
            *opts
        };
        inner.transport.send(ServerMessage::SessionUpdated { options: updated }).await
    }

    /// Point-in-time copy; not a live view (spec.md §4.6).
    pub fn list_active(&self) -> Vec<SessionSummary> {
        self.sessions.read().unwrap().values().map(|s| s.summary()).collect()
    }

    pub fn stats(&self) -> SessionManagerStats {
        SessionManagerStats {
            active_count: self.sessions.read().unwrap().len(),
            total_count_since_start: self.total_sessions_started.load(Ordering::Relaxed),
            total_frames: self.total_frames_sent.load(Ordering::Relaxed),
            uptime: self.manager_started_at.elapsed(),
        }
    }
}

async fn capture_loop(
    inner: Arc<SessionInner>,
    engine: Arc<CaptureEngine>,
    codec: Arc<Codec>,
    config: EngineConfig,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    total_frames_sent: Arc<AtomicU64>,
) {
    let mut frame_number: u64 = 0;
    let mut consecutive_window_not_found: u32 = 0;
    let mut last_warning: Option<Instant> = None;

    let mut current_interval = inner.options.lock().unwrap().tick_interval();
    let mut ticker = tokio::time::interval(current_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if *shutdown_rx.borrow() {
                    break;
                }
                let opts = *inner.options.lock().unwrap();
                if opts.tick_interval() != current_interval {
                    current_interval = opts.tick_interval();
                    ticker = tokio::time::interval(current_interval);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                }

                match engine.capture_by_handle(inner.target, &default_stream_capture_options()).await {
                    Ok(mut buffer) => {
                        consecutive_window_not_found = 0;
                        if opts.max_width > 0 && buffer.width > opts.max_width {
                            let new_height = if opts.max_height > 0 {
                                opts.max_height
                            } else {
                                ((buffer.height as u64 * opts.max_width as u64) / buffer.width.max(1) as u64) as u32
                            };
                            match codec.resize(&buffer, opts.max_width, new_height) {
                                Ok(resized) => buffer = resized,
                                Err(e) => {
                                    warn_throttled(&mut last_warning, config.capture_warning_interval, &e.to_string());
                                    continue;
                                }
                            }
                        }
                        let encoded = match codec.encode(&buffer, opts.format, opts.quality) {
                            Ok(e) => e,
                            Err(e) => {
                                warn_throttled(&mut last_warning, config.capture_warning_interval, &e.to_string());
                                continue;
                            }
                        };
                        let data_url = codec.to_data_url(&encoded);
                        frame_number += 1;
                        let size = data_url.len();
                        let timestamp = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_millis() as u64;
                        let message = FrameMessage {
                            frame_number,
                            width: encoded.width,
                            height: encoded.height,
                            format: encoded.format,
                            data_url,
                            size,
                            timestamp,
                        };
                        if inner.transport.send(ServerMessage::Frame(message)).await.is_err() {
                            break;
                        }
                        inner.frame_count.fetch_add(1, Ordering::Relaxed);
                        inner.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
                        total_frames_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(CaptureError::WindowNotFound) => {
                        consecutive_window_not_found += 1;
                        warn_throttled(&mut last_warning, config.capture_warning_interval, "window not found");
                        if consecutive_window_not_found >= config.fatal_window_not_found_ticks {
                            let _ = inner.transport.send(ServerMessage::Error {
                                message: "window no longer exists".into(),
                                session_id: Some(inner.id.clone()),
                            }).await;
                            break;
                        }
                    }
                    Err(e) => {
                        warn_throttled(&mut last_warning, config.capture_warning_interval, &e.to_string());
                    }
                }
            }
        }
    }

    *inner.state.lock().unwrap() = SessionState::Closed;
}

fn warn_throttled(last_warning: &mut Option<Instant>, interval: Duration, message: &str) {
    let now = Instant::now();
    let should_log = match last_warning {
        Some(last) => now.duration_since(*last) >= interval,
        None => true,
    };
    if should_log {
        tracing::warn!(message, "capture tick failed");
        *last_warning = Some(now);
    }
}

async fn control_reader(inner: Arc<SessionInner>, mut shutdown_rx: tokio::sync::watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return;
                }
            }
            result = inner.transport.recv() => {
                match result {
                    Ok(None) => {
                        let _ = inner.shutdown.send(true);
                        return;
                    }
                    Err(_) => {
                        let _ = inner.shutdown.send(true);
                        return;
                    }
                    Ok(Some(value)) => {
                        handle_control_message(&inner, value).await;
                    }
                }
            }
        }
    }
}

async fn handle_control_message(inner: &Arc<SessionInner>, value: serde_json::Value) {
    match serde_json::from_value::<ClientCommand>(value.clone()) {
        Ok(ClientCommand::UpdateOptions(patch)) => {
            let updated = {
                let mut opts = inner.options.lock().unwrap();
                opts.merge(&patch);
                *opts
            };
            let _ = inner.transport.send(ServerMessage::SessionUpdated { options: updated }).await;
        }
        Ok(ClientCommand::GetStatus) => {
            let status = SessionStatus {
                session_id: inner.id.clone(),
                window_id: inner.target.0,
                active: *inner.state.lock().unwrap() == SessionState::Active,
                fps: inner.options.lock().unwrap().fps,
                frame_count: inner.frame_count.load(Ordering::Relaxed),
                bytes_sent: inner.bytes_sent.load(Ordering::Relaxed),
                duration_ms: inner.started_at.elapsed().as_millis() as u64,
                options: *inner.options.lock().unwrap(),
            };
            let _ = inner.transport.send(ServerMessage::Status(status)).await;
        }
        Ok(ClientCommand::Stop) => {
            let _ = inner.shutdown.send(true);
        }
        Err(_) => {
            let name = value.get("command").and_then(serde_json::Value::as_str).unwrap_or("<unknown>");
            let _ = inner
                .transport
                .send(ServerMessage::Error { message: format!("unknown command: {name}"), session_id: Some(inner.id.clone()) })
                .await;
        }
    }
}

//! Scenarios (d) and (e): stream pacing / fps updates, and isolation between
//! two concurrently running sessions.

mod support;

use std::sync::Arc;
use std::time::Duration;

use capture_engine::config::EngineConfig;
use capture_engine::engine::CaptureEngine;
use capture_engine::os::OsWorker;
use capture_engine::stream::{SessionManager, Transport};
use capture_engine::codec::Codec;
use capture_proto::{CaptureResult, ServerMessage, StreamOptions, StreamOptionsPatch, WindowHandle};
use support::{visible_window, MockPrimitives};

/// In-memory transport: `send` pushes onto an mpsc channel the test reads
/// from, `recv` pulls from another the test writes control messages into.
struct ChannelTransport {
    outgoing: tokio::sync::mpsc::UnboundedSender<ServerMessage>,
    incoming: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<Option<serde_json::Value>>>,
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, message: ServerMessage) -> CaptureResult<()> {
        let _ = self.outgoing.send(message);
        Ok(())
    }

    async fn recv(&self) -> CaptureResult<Option<serde_json::Value>> {
        Ok(self.incoming.lock().await.recv().await.flatten())
    }
}

fn make_transport() -> (Arc<ChannelTransport>, tokio::sync::mpsc::UnboundedReceiver<ServerMessage>, tokio::sync::mpsc::UnboundedSender<Option<serde_json::Value>>) {
    let (out_tx, out_rx) = tokio::sync::mpsc::unbounded_channel();
    let (in_tx, in_rx) = tokio::sync::mpsc::unbounded_channel();
    let transport = Arc::new(ChannelTransport { outgoing: out_tx, incoming: tokio::sync::Mutex::new(in_rx) });
    (transport, out_rx, in_tx)
}

fn manager_with_window(handle: u64) -> (Arc<SessionManager>, OsWorker) {
    let mock = Arc::new(MockPrimitives::new());
    mock.insert_window(visible_window(handle, "Streamed Window"));
    let worker = OsWorker::spawn_with(mock);
    let engine = Arc::new(CaptureEngine::new(worker.handle(), EngineConfig::default()));
    let codec = Arc::new(Codec::new());
    let manager = Arc::new(SessionManager::new(engine, codec, EngineConfig::default()));
    (manager, worker)
}

#[tokio::test]
async fn session_started_then_frames_flow_at_the_configured_rate() {
    let (manager, _worker) = manager_with_window(1);
    let (transport, mut out_rx, _in_tx) = make_transport();

    let options = StreamOptions { fps: 20, ..Default::default() };
    let id = manager.start_session(WindowHandle(1), options, transport).await.unwrap();

    let first = out_rx.recv().await.unwrap();
    assert!(matches!(first, ServerMessage::SessionStarted { .. }));

    let mut frames_seen = 0;
    for _ in 0..3 {
        if let Ok(Some(ServerMessage::Frame(_))) = tokio::time::timeout(Duration::from_millis(500), out_rx.recv()).await {
            frames_seen += 1;
        }
    }
    assert!(frames_seen >= 2, "expected at least 2 frames at 20fps within the timeout, got {frames_seen}");

    manager.stop_session(&id).unwrap();
}

#[tokio::test]
async fn update_options_merges_sparsely_and_acks() {
    let (manager, _worker) = manager_with_window(2);
    let (transport, mut out_rx, _in_tx) = make_transport();

    let options = StreamOptions { fps: 5, quality: 80, ..Default::default() };
    let id = manager.start_session(WindowHandle(2), options, transport).await.unwrap();
    let _started = out_rx.recv().await.unwrap();

    manager.update_session(&id, StreamOptionsPatch { fps: Some(30), ..Default::default() }).await.unwrap();
    // Drain frames until we see the ack.
    let mut saw_update = false;
    for _ in 0..20 {
        match tokio::time::timeout(Duration::from_millis(500), out_rx.recv()).await {
            Ok(Some(ServerMessage::SessionUpdated { options })) => {
                assert_eq!(options.fps, 30);
                assert_eq!(options.quality, 80);
                saw_update = true;
                break;
            }
            Ok(Some(_)) => continue,
            _ => break,
        }
    }
    assert!(saw_update, "expected a session_updated ack after update_session");
    manager.stop_session(&id).unwrap();
}

#[tokio::test]
async fn two_concurrent_sessions_are_isolated() {
    let mock = Arc::new(MockPrimitives::new());
    mock.insert_window(support::visible_window(1, "Window A"));
    mock.insert_window(support::visible_window(2, "Window B"));
    let worker = OsWorker::spawn_with(mock);
    let engine = Arc::new(CaptureEngine::new(worker.handle(), EngineConfig::default()));
    let codec = Arc::new(Codec::new());
    let manager = Arc::new(SessionManager::new(engine, codec, EngineConfig::default()));

    let (transport_a, mut rx_a, _tx_a) = make_transport();
    let (transport_b, mut rx_b, _tx_b) = make_transport();

    let id_a = manager.start_session(WindowHandle(1), StreamOptions { fps: 30, ..Default::default() }, transport_a).await.unwrap();
    let id_b = manager.start_session(WindowHandle(2), StreamOptions { fps: 5, ..Default::default() }, transport_b).await.unwrap();
    assert_ne!(id_a, id_b);

    let _ = rx_a.recv().await; // session_started for A
    let _ = rx_b.recv().await; // session_started for B

    manager.update_session(&id_a, StreamOptionsPatch { fps: Some(60), ..Default::default() }).await.unwrap();

    let stats = manager.stats();
    assert_eq!(stats.active_count, 2);
    assert_eq!(stats.total_count_since_start, 2);

    let summaries = manager.list_active();
    let summary_b = summaries.iter().find(|s| s.id == id_b).unwrap();
    assert_eq!(summary_b.options.fps, 5, "session B must be unaffected by A's update");

    manager.stop_session(&id_a).unwrap();
    manager.stop_session(&id_b).unwrap();
    assert_eq!(manager.list_active().len(), 0);
}

#[tokio::test]
async fn stopping_an_unknown_session_is_not_an_error() {
    let (manager, _worker) = manager_with_window(1);
    assert!(manager.stop_session("sess-does-not-exist").is_ok());
}

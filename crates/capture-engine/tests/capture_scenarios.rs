//! End-to-end capture scenarios driven through a mock OS primitives impl
//! (no real desktop required).

mod support;

use std::sync::Arc;
use std::time::Duration;

use capture_engine::config::EngineConfig;
use capture_engine::engine::CaptureEngine;
use capture_engine::os::OsWorker;
use capture_proto::{CaptureMethod, CaptureOptions, WindowHandle, WindowState};
use support::{visible_window, FailurePlan, MockPrimitives};

/// Scenario (a): a visible window is captured with direct-blit and encodes
/// cleanly to PNG.
#[tokio::test]
async fn visible_window_direct_blit_encodes_png() {
    let mock = Arc::new(MockPrimitives::new());
    mock.insert_window(visible_window(1, "Notepad"));
    let worker = OsWorker::spawn_with(mock.clone());
    let engine = CaptureEngine::new(worker.handle(), EngineConfig::default());

    let buffer = engine.capture_by_handle(WindowHandle(1), &CaptureOptions::default()).await.unwrap();
    assert_eq!(buffer.width, 640);
    assert_eq!(buffer.height, 480);

    let codec = capture_engine::codec::Codec::new();
    let encoded = codec.encode(&buffer, capture_proto::ImageFormat::Png, 90).unwrap();
    assert_eq!(encoded.mime, "image/png");
    assert!(mock.all_resources_released());
}

/// Scenario (c): direct-blit and window-print both fail, so the fallback
/// chain falls through to message-print, and the outcome reports which
/// method actually produced pixels.
#[tokio::test]
async fn cascading_fallback_reports_winning_method() {
    let mock = Arc::new(MockPrimitives::with_failures(FailurePlan {
        blit_fails: true,
        print_window_fails: true,
        ..Default::default()
    }));
    mock.insert_window(visible_window(2, "Browser"));
    let worker = OsWorker::spawn_with(mock.clone());
    let engine = CaptureEngine::new(worker.handle(), EngineConfig::default());

    let outcome = engine.capture_with_fallbacks(WindowHandle(2), &CaptureOptions::default()).await.unwrap();
    assert_eq!(outcome.method, CaptureMethod::MessagePrint);
    assert!(mock.all_resources_released());
}

/// All methods failing surfaces `AllMethodsFailed` with every attempt recorded.
#[tokio::test]
async fn all_methods_failing_is_reported_with_attempts() {
    let mock = Arc::new(MockPrimitives::with_failures(FailurePlan {
        blit_fails: true,
        print_window_fails: true,
        send_paint_fails: true,
        compositor_fails: true,
    }));
    mock.insert_window(visible_window(3, "Stubborn"));
    let worker = OsWorker::spawn_with(mock.clone());
    let engine = CaptureEngine::new(worker.handle(), EngineConfig::default());

    let err = engine.capture_with_fallbacks(WindowHandle(3), &CaptureOptions::default()).await.unwrap_err();
    match err {
        capture_proto::CaptureError::AllMethodsFailed { attempts } => {
            assert_eq!(attempts.len(), 3); // DirectBlit, WindowPrint, CompositorThumbnail for Visible state
        }
        other => panic!("expected AllMethodsFailed, got {other:?}"),
    }
    assert!(mock.all_resources_released());
}

/// A minimized window is rejected up front unless `allow_minimized` is set.
#[tokio::test]
async fn minimized_window_requires_allow_minimized() {
    let mock = Arc::new(MockPrimitives::new());
    let mut w = visible_window(4, "Minimized App");
    w.state = WindowState::Minimized;
    w.is_visible = false;
    mock.insert_window(w);
    let worker = OsWorker::spawn_with(mock.clone());
    let engine = CaptureEngine::new(worker.handle(), EngineConfig::default());

    let denied = engine.capture_with_fallbacks(WindowHandle(4), &CaptureOptions::default()).await;
    assert!(matches!(denied, Err(capture_proto::CaptureError::AccessDenied(_))));

    let allowed_opts = CaptureOptions { allow_minimized: true, ..Default::default() };
    let outcome = engine.capture_with_fallbacks(WindowHandle(4), &allowed_opts).await.unwrap();
    assert_eq!(outcome.method, CaptureMethod::CompositorThumbnail);
}

/// Capturing a handle that doesn't exist surfaces `WindowNotFound`, not a panic.
#[tokio::test]
async fn unknown_handle_is_window_not_found() {
    let mock = Arc::new(MockPrimitives::new());
    let worker = OsWorker::spawn_with(mock);
    let engine = CaptureEngine::new(worker.handle(), EngineConfig::default());

    let err = engine.capture_by_handle(WindowHandle(999), &CaptureOptions::default()).await.unwrap_err();
    assert_eq!(err, capture_proto::CaptureError::WindowNotFound);
}

/// retry_count causes the same method to be attempted multiple times before
/// giving up, spaced by the configured backoff.
#[tokio::test]
async fn retry_count_is_honored_before_failing() {
    let mock = Arc::new(MockPrimitives::with_failures(FailurePlan { blit_fails: true, ..Default::default() }));
    mock.insert_window(visible_window(5, "Retry Target"));
    let worker = OsWorker::spawn_with(mock.clone());
    let mut config = EngineConfig::default();
    config.retry_backoff = Duration::from_millis(1);
    let engine = CaptureEngine::new(worker.handle(), config);

    let opts = CaptureOptions {
        preferred_method: capture_proto::PreferredMethod::Method(CaptureMethod::DirectBlit),
        fallback_methods: vec![],
        retry_count: 2,
        ..Default::default()
    };
    // DirectBlit always fails; with no other method in the Visible default
    // order excluded, the chain still falls through to WindowPrint/CompositorThumbnail.
    let outcome = engine.capture_with_fallbacks(WindowHandle(5), &opts).await.unwrap();
    assert_ne!(outcome.method, CaptureMethod::DirectBlit);
}

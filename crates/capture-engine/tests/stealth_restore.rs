//! Testable property 2: stealth-restore always reasserts the window's
//! original placement, whether or not the capture underneath it succeeds.

mod support;

use std::sync::Arc;

use capture_engine::config::EngineConfig;
use capture_engine::engine::CaptureEngine;
use capture_engine::os::OsWorker;
use capture_proto::{CaptureMethod, CaptureOptions, PreferredMethod, WindowHandle, WindowState};
use support::{visible_window, FailurePlan, MockPrimitives};

#[tokio::test]
async fn placement_is_reasserted_after_successful_capture() {
    let mock = Arc::new(MockPrimitives::new());
    let mut w = visible_window(1, "Minimized");
    w.state = WindowState::Minimized;
    mock.insert_window(w);

    let original = mock.placement_of(1);
    let worker = OsWorker::spawn_with(mock.clone());
    let engine = CaptureEngine::new(worker.handle(), EngineConfig::default());

    let opts = CaptureOptions {
        allow_minimized: true,
        preferred_method: PreferredMethod::Method(CaptureMethod::StealthRestore),
        ..Default::default()
    };
    let outcome = engine.capture_with_fallbacks(WindowHandle(1), &opts).await.unwrap();
    assert_eq!(outcome.method, CaptureMethod::StealthRestore);

    let restored = mock.placement_of(1);
    assert_eq!(restored.show_command, original.show_command);
}

/// Force the stealth-restore attempt itself to fail internally (its
/// direct-blit step fails); the fallback chain recovers via another method,
/// but the placement must have been reasserted regardless.
#[tokio::test]
async fn placement_is_reasserted_even_when_the_restore_attempt_fails() {
    let mock = Arc::new(MockPrimitives::with_failures(FailurePlan { blit_fails: true, ..Default::default() }));
    let mut w = visible_window(2, "Minimized Stubborn");
    w.state = WindowState::Minimized;
    mock.insert_window(w);

    let original = mock.placement_of(2);
    let worker = OsWorker::spawn_with(mock.clone());
    let engine = CaptureEngine::new(worker.handle(), EngineConfig::default());

    let opts = CaptureOptions {
        allow_minimized: true,
        preferred_method: PreferredMethod::Method(CaptureMethod::StealthRestore),
        ..Default::default()
    };
    // StealthRestore's internal direct_blit fails, so the fallback chain
    // moves on to CompositorThumbnail, which the mock allows.
    let outcome = engine.capture_with_fallbacks(WindowHandle(2), &opts).await.unwrap();
    assert_eq!(outcome.method, CaptureMethod::CompositorThumbnail);

    let restored = mock.placement_of(2);
    assert_eq!(restored.show_command, original.show_command);
}

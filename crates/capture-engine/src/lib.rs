//! Window, desktop, and browser-tab capture engine.
//!
//! Module map (spec.md §2):
//! - [`os`] — C1, the platform primitives trait and its Windows/stub impls.
//! - [`inventory`] — C2, window enumeration and target resolution.
//! - [`engine`] — C3, method selection and the fallback/retry chain.
//! - [`codec`] — C4, encode/decode/resize/crop.
//! - [`browser`] — C5, Chrome-DevTools-style tab capture.
//! - [`stream`] — C6, the streaming session manager.

pub mod browser;
pub mod codec;
pub mod config;
pub mod engine;
pub mod inventory;
pub mod os;
pub mod stream;

pub use browser::BrowserCapture;
pub use codec::Codec;
pub use config::EngineConfig;
pub use engine::{CaptureEngine, CaptureOutcome};
pub use inventory::WindowInventory;
pub use os::{platform_primitives, CapturePrimitives, OsWorker, OsWorkerHandle};
pub use stream::{SessionManager, Transport};

pub use capture_proto::*;

/// Wires up a worker thread, inventory, engine, codec, and session manager
/// with default configuration. Most hosts only need this one call.
pub fn build(config: EngineConfig) -> (OsWorker, std::sync::Arc<CaptureEngine>, std::sync::Arc<Codec>, std::sync::Arc<SessionManager>) {
    let worker = OsWorker::spawn();
    let engine = std::sync::Arc::new(CaptureEngine::new(worker.handle(), config));
    let codec = std::sync::Arc::new(Codec::new());
    let sessions = std::sync::Arc::new(SessionManager::new(engine.clone(), codec.clone(), config));
    (worker, engine, codec, sessions)
}

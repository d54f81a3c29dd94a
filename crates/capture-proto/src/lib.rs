//! Domain and wire-protocol types for the window & tab capture engine.
//!
//! This crate has no OS dependencies: everything here is plain data plus
//! pure helper methods, so it can be exercised in unit tests without a
//! desktop session.
mod browser;
mod error;
mod image;
mod message;
mod method;
mod options;
mod session;
mod window;

pub use browser::{BrowserInstance, BrowserTab};
pub use error::{CaptureError, CaptureResult};
pub use image::{EncodedImage, ImageFormat, PixelBuffer, PixelOrder};
pub use message::{ClientCommand, FrameMessage, ServerMessage, SessionStatus};
pub use method::{CaptureMethod, PreferredMethod, WindowState};
pub use options::{CaptureOptions, StreamOptions, StreamOptionsPatch};
pub use session::{SessionManagerStats, SessionState, SessionSummary, StreamSession};
pub use window::{is_system_window, TargetSpec, WindowDescriptor, WindowFilter, WindowHandle};

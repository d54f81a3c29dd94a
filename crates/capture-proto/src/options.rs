use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use capture_geom::Rectangle;

use crate::method::{CaptureMethod, PreferredMethod};
use crate::ImageFormat;

/// Options accepted by every `capture_*` operation on the capture engine.
///
/// Field semantics are exactly as documented in spec.md §3; defaults mirror
/// "conservative, single-capture-behaves-like-direct-blit" expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub include_cursor: bool,
    pub include_frame: bool,
    /// Clip, in window-relative coordinates. `None` means "whole target".
    pub region: Option<Rectangle>,
    pub scale_factor: f32,
    pub allow_minimized: bool,
    pub allow_hidden: bool,
    pub allow_cloaked: bool,
    pub allow_tray: bool,
    pub restore_window: bool,
    pub wait_for_visible: Duration,
    pub preferred_method: PreferredMethod,
    pub fallback_methods: Vec<CaptureMethod>,
    pub retry_count: u32,
    pub custom_properties: BTreeMap<String, String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            include_cursor: false,
            include_frame: true,
            region: None,
            scale_factor: 1.0,
            allow_minimized: false,
            allow_hidden: false,
            allow_cloaked: false,
            allow_tray: false,
            restore_window: false,
            wait_for_visible: Duration::from_millis(500),
            preferred_method: PreferredMethod::Auto,
            fallback_methods: Vec::new(),
            retry_count: 0,
            custom_properties: BTreeMap::new(),
        }
    }
}

/// Options for a single streaming session, mutable mid-stream via a sparse
/// [`crate::message::ClientCommand::UpdateOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Frames per second, clamped to `1..=60` by [`StreamOptions::clamp`].
    pub fps: u32,
    /// Lossy quality `1..=100`; ignored for lossless formats.
    pub quality: u8,
    pub format: ImageFormat,
    /// Downscale-only bound; `0` means unbounded.
    pub max_width: u32,
    /// Downscale-only bound; `0` means unbounded.
    pub max_height: u32,
    /// Bounded lag queue size. The session manager keeps at most one frame
    /// in flight regardless of this value (spec.md §4.6.1); it is exposed
    /// for callers that want to size their own transport buffers.
    pub buffer_size: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            fps: 10,
            quality: 85,
            format: ImageFormat::Jpeg,
            max_width: 0,
            max_height: 0,
            buffer_size: 1,
        }
    }
}

impl StreamOptions {
    /// Clamp `fps` to `1..=60` and `quality` to `1..=100`.
    pub fn clamp(&mut self) {
        self.fps = self.fps.clamp(1, 60);
        self.quality = self.quality.clamp(1, 100);
    }

    /// Tick period implied by `fps`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps.max(1) as u64)
    }

    /// Apply a sparse update in place: only `Some` fields in `patch` override.
    pub fn merge(&mut self, patch: &StreamOptionsPatch) {
        if let Some(fps) = patch.fps {
            self.fps = fps;
        }
        if let Some(quality) = patch.quality {
            self.quality = quality;
        }
        if let Some(format) = patch.format {
            self.format = format;
        }
        if let Some(w) = patch.max_width {
            self.max_width = w;
        }
        if let Some(h) = patch.max_height {
            self.max_height = h;
        }
        self.clamp();
    }
}

/// Sparse patch for [`StreamOptions::merge`]; mirrors the `update_options`
/// wire payload in spec.md §6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamOptionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

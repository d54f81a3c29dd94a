use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use capture_geom::{Density, Rectangle};

use crate::window::WindowDescriptor;

/// Output/encode format tag. `Bmp` may be substituted with a PNG payload by
/// the encoder when no dedicated BMP codec is linked in; callers must read
/// [`EncodedImage::mime`] rather than assume `format` and `mime` always
/// agree (spec.md §4.4 / §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
    Bmp,
}

impl ImageFormat {
    /// `true` for formats where `quality` has no meaning.
    pub fn is_lossless(&self) -> bool {
        matches!(self, ImageFormat::Png | ImageFormat::Bmp)
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
        }
    }
}

/// Per-channel byte order of a raw [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelOrder {
    /// Native order produced by the reference compositor's device contexts.
    Bgra8,
    /// Order most codecs expect.
    Rgba8,
}

/// A raw capture, owned by a single consumer at a time (C1 produces it, C4
/// or a direct serializer consumes it — never both).
///
/// Invariant: `bytes.len() == stride as usize * height as usize` and
/// `stride >= width as u32 * 4`.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub order: PixelOrder,
    pub density: Density,
    pub captured_at: SystemTime,
    /// Source rectangle in screen coordinates.
    pub source_rect: Rectangle,
    pub source_window: Option<WindowDescriptor>,
}

impl PixelBuffer {
    /// Builds a buffer, computing the tightest valid stride (`width * 4`).
    ///
    /// Returns `None` if `bytes.len()` doesn't match `width * height * 4`.
    pub fn new(
        bytes: Vec<u8>,
        width: u32,
        height: u32,
        order: PixelOrder,
        density: Density,
        captured_at: SystemTime,
        source_rect: Rectangle,
        source_window: Option<WindowDescriptor>,
    ) -> Option<Self> {
        let stride = width.checked_mul(4)?;
        if bytes.len() as u64 != stride as u64 * height as u64 {
            return None;
        }
        Some(Self {
            bytes: Arc::from(bytes),
            width,
            height,
            stride,
            order,
            density,
            captured_at,
            source_rect,
            source_window,
        })
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width as i32, self.height as i32)
    }
}

/// Output of the encoder (C4); immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Arc<[u8]>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Actual MIME of `bytes`; may differ from `format` (BMP→PNG fallback).
    pub mime: &'static str,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>` per spec.md §4.4.
    pub fn to_data_url(&self) -> String {
        use base64::Engine as _;
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes[..]);
        format!("data:{};base64,{}", self.mime, payload)
    }
}

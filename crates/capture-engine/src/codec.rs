//! C4: Encoder / Image Processor. Stateless; every operation is a pure
//! function of its inputs. Built on the `image` crate the way the teacher's
//! image cache uses it for format conversion and resampling.

use std::sync::Arc;
use std::time::SystemTime;

use capture_geom::{Density, Rectangle};
use capture_proto::{CaptureError, CaptureResult, EncodedImage, ImageFormat, PixelBuffer, PixelOrder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat as ExternalFormat, RgbaImage};

/// Stateless codec: convert pixel order, encode/decode, resize, crop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec;

impl Codec {
    pub fn new() -> Self {
        Self
    }

    /// Converts native pixel order to the codec-standard RGBA order, then
    /// encodes. Lossless formats ignore `quality`; lossy formats clamp to
    /// `[1, 100]`, defaulting to 95 if out of range (spec.md §4.4).
    pub fn encode(&self, buffer: &PixelBuffer, format: ImageFormat, quality: u8) -> CaptureResult<EncodedImage> {
        let rgba = to_rgba_image(buffer)?;
        let quality = if format.is_lossless() { quality } else { clamp_quality(quality) };

        let mut bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        let dynamic = DynamicImage::ImageRgba8(rgba);

        let mime = match format {
            ImageFormat::Png => {
                dynamic
                    .write_to(&mut cursor, ExternalFormat::Png)
                    .map_err(|e| CaptureError::OSError(format!("PNG encode failed: {e}")))?;
                format.mime()
            }
            ImageFormat::Jpeg => {
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
                dynamic
                    .write_with_encoder(encoder)
                    .map_err(|e| CaptureError::OSError(format!("JPEG encode failed: {e}")))?;
                format.mime()
            }
            ImageFormat::WebP => {
                dynamic
                    .write_to(&mut cursor, ExternalFormat::WebP)
                    .map_err(|e| CaptureError::OSError(format!("WebP encode failed: {e}")))?;
                format.mime()
            }
            ImageFormat::Bmp => {
                // No dedicated BMP encoder linked in; substitute PNG and say so via mime
                // (spec.md §4.4 / §9 — a deliberate deviation from silent substitution).
                dynamic
                    .write_to(&mut cursor, ExternalFormat::Png)
                    .map_err(|e| CaptureError::OSError(format!("PNG (BMP substitute) encode failed: {e}")))?;
                ImageFormat::Png.mime()
            }
        };

        Ok(EncodedImage {
            bytes: Arc::from(bytes),
            format,
            width: buffer.width,
            height: buffer.height,
            mime,
        })
    }

    /// Format-sniffed decode into a native-order [`PixelBuffer`].
    pub fn decode(&self, bytes: &[u8]) -> CaptureResult<PixelBuffer> {
        let dynamic = image::load_from_memory(bytes).map_err(|e| CaptureError::InvalidArgument(format!("undecodable image: {e}")))?;
        let rgba = dynamic.to_rgba8();
        let (width, height) = rgba.dimensions();
        let bgra = rgba_to_bgra(&rgba);
        PixelBuffer::new(
            bgra,
            width,
            height,
            PixelOrder::Bgra8,
            Density::DEFAULT,
            SystemTime::now(),
            Rectangle::new(0, 0, width as i32, height as i32),
            None,
        )
        .ok_or_else(|| CaptureError::OSError("decoded byte count did not match declared dimensions".into()))
    }

    /// High-quality resample (Lanczos3). `0` for one dimension preserves
    /// aspect using the other (spec.md §4.4).
    pub fn resize(&self, buffer: &PixelBuffer, width: u32, height: u32) -> CaptureResult<PixelBuffer> {
        if width == 0 && height == 0 {
            return Err(CaptureError::InvalidArgument("resize requires at least one positive dimension".into()));
        }
        let (target_w, target_h) = match (width, height) {
            (0, h) => (scaled_dimension(buffer.width, buffer.height, h), h),
            (w, 0) => (w, scaled_dimension(buffer.height, buffer.width, w)),
            (w, h) => (w, h),
        };
        let rgba = to_rgba_image(buffer)?;
        let resized = image::imageops::resize(&rgba, target_w, target_h, FilterType::Lanczos3);
        let bgra = rgba_to_bgra(&resized);
        PixelBuffer::new(
            bgra,
            target_w,
            target_h,
            PixelOrder::Bgra8,
            buffer.density,
            buffer.captured_at,
            Rectangle::new(0, 0, target_w as i32, target_h as i32),
            buffer.source_window.clone(),
        )
        .ok_or_else(|| CaptureError::OSError("resize produced an inconsistent byte count".into()))
    }

    /// Intersect with buffer bounds; empty intersection fails with
    /// `InvalidArgument` (spec.md §4.4, testable property 6).
    pub fn crop(&self, buffer: &PixelBuffer, rect: Rectangle) -> CaptureResult<PixelBuffer> {
        let clipped = buffer.bounds().intersect(rect);
        if clipped.is_empty() {
            return Err(CaptureError::InvalidArgument("crop rectangle does not intersect buffer bounds".into()));
        }
        let stride = buffer.stride as usize;
        let mut out = Vec::with_capacity(clipped.width as usize * clipped.height as usize * 4);
        for row in 0..clipped.height {
            let src_row = (clipped.y + row) as usize;
            let row_start = src_row * stride + clipped.x as usize * 4;
            let row_end = row_start + clipped.width as usize * 4;
            out.extend_from_slice(&buffer.bytes[row_start..row_end]);
        }
        PixelBuffer::new(
            out,
            clipped.width as u32,
            clipped.height as u32,
            buffer.order,
            buffer.density,
            buffer.captured_at,
            clipped,
            buffer.source_window.clone(),
        )
        .ok_or_else(|| CaptureError::OSError("crop produced an inconsistent byte count".into()))
    }

    /// `data:<mime>;base64,<payload>` (spec.md §4.4).
    pub fn to_data_url(&self, encoded: &EncodedImage) -> String {
        encoded.to_data_url()
    }
}

fn clamp_quality(quality: u8) -> u8 {
    if (1..=100).contains(&quality) {
        quality
    } else {
        95
    }
}

fn scaled_dimension(known_dim: u32, other_known: u32, target_known: u32) -> u32 {
    if known_dim == 0 {
        return 0;
    }
    ((other_known as u64 * target_known as u64) / known_dim as u64) as u32
}

fn to_rgba_image(buffer: &PixelBuffer) -> CaptureResult<RgbaImage> {
    let mut rgba = vec![0u8; buffer.bytes.len()];
    match buffer.order {
        PixelOrder::Bgra8 => {
            for (src, dst) in buffer.bytes.chunks_exact(4).zip(rgba.chunks_exact_mut(4)) {
                dst[0] = src[2];
                dst[1] = src[1];
                dst[2] = src[0];
                dst[3] = src[3];
            }
        }
        PixelOrder::Rgba8 => rgba.copy_from_slice(&buffer.bytes),
    }
    RgbaImage::from_raw(buffer.width, buffer.height, rgba)
        .ok_or_else(|| CaptureError::OSError("pixel buffer dimensions do not match its byte length".into()))
}

fn rgba_to_bgra(rgba: &RgbaImage) -> Vec<u8> {
    let mut out = vec![0u8; rgba.as_raw().len()];
    for (src, dst) in rgba.as_raw().chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        dst[0] = src[2];
        dst[1] = src[1];
        dst[2] = src[0];
        dst[3] = src[3];
    }
    out
}

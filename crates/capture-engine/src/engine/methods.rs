//! C3 method implementations (spec.md §4.3.2). Each function dispatches
//! through [`OsWorkerHandle`] and returns the method's raw [`PixelBuffer`];
//! `engine::mod` wraps these with retry/fallback-chain orchestration.

use std::time::{Duration, SystemTime};

use capture_geom::{Density, Rectangle};
use capture_proto::{CaptureError, CaptureOptions, CaptureResult, PixelBuffer, PixelOrder, WindowDescriptor};

use crate::config::EngineConfig;
use crate::os::{ContextArea, DeviceContextGuard, MemoryTargetGuard, OsWorkerHandle, PaintFlags, ShowCommand, ThumbnailGuard};

/// Resolves the rectangle a method should target: `include_frame` picks
/// outer vs client rect, then intersects with `options.region` if set
/// (spec.md §4.3.3).
pub(crate) fn target_rect(descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<Rectangle> {
    let base = if options.include_frame { descriptor.outer_rect } else { descriptor.client_rect };
    let rect = match options.region {
        Some(region) => {
            let clipped = base.intersect(region);
            if clipped.is_empty() {
                return Err(CaptureError::InvalidArgument("region does not intersect window bounds".into()));
            }
            clipped
        }
        None => base,
    };
    if rect.width <= 0 || rect.height <= 0 {
        return Err(CaptureError::InvalidArgument("target rectangle has non-positive dimensions".into()));
    }
    Ok(rect)
}

fn build_buffer(bytes: Vec<u8>, rect: Rectangle, dpi: u32, descriptor: WindowDescriptor) -> CaptureResult<PixelBuffer> {
    PixelBuffer::new(
        bytes,
        rect.width as u32,
        rect.height as u32,
        PixelOrder::Bgra8,
        Density(dpi),
        SystemTime::now(),
        rect,
        Some(descriptor),
    )
    .ok_or_else(|| CaptureError::OSError("read-back byte count did not match rectangle dimensions".into()))
}

pub(crate) async fn direct_blit(os: &OsWorkerHandle, descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
    let rect = target_rect(descriptor, options)?;
    let handle = descriptor.handle;
    let area = if options.include_frame { ContextArea::Outer } else { ContextArea::Client };
    let owned_descriptor = descriptor.clone();
    let bytes = os
        .run(move |p| -> CaptureResult<Vec<u8>> {
            let src = DeviceContextGuard::new(p, p.get_window_context(handle, area)?);
            let mem_id = p.create_compatible_memory_target(src.id(), rect.width, rect.height)?;
            let mem = MemoryTargetGuard::new(p, mem_id, rect.width, rect.height);
            p.blit(mem.id(), src.id(), Rectangle::new(rect.x, rect.y, rect.width, rect.height))?;
            p.read_back(mem.id(), rect.width, rect.height)
        })
        .await?;
    let dpi = os.run(move |p| p.query_dpi(Some(handle))).await.unwrap_or(96);
    build_buffer(bytes, rect, dpi, owned_descriptor)
}

pub(crate) async fn window_print(os: &OsWorkerHandle, descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
    let rect = target_rect(descriptor, options)?;
    let handle = descriptor.handle;
    let include_frame = options.include_frame;
    let owned_descriptor = descriptor.clone();
    let bytes = os
        .run(move |p| -> CaptureResult<Vec<u8>> {
            let screen = DeviceContextGuard::new(p, p.get_screen_context()?);
            let mem_id = p.create_compatible_memory_target(screen.id(), rect.width, rect.height)?;
            let mem = MemoryTargetGuard::new(p, mem_id, rect.width, rect.height);
            p.print_window(handle, mem.id(), include_frame)?;
            p.read_back(mem.id(), rect.width, rect.height)
        })
        .await?;
    let dpi = os.run(move |p| p.query_dpi(Some(handle))).await.unwrap_or(96);
    build_buffer(bytes, rect, dpi, owned_descriptor)
}

pub(crate) async fn message_print(os: &OsWorkerHandle, descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
    let rect = target_rect(descriptor, options)?;
    let handle = descriptor.handle;
    let owned_descriptor = descriptor.clone();
    let flags = PaintFlags::CLIENT | PaintFlags::NON_CLIENT | PaintFlags::CHILDREN | PaintFlags::OWNED;
    let bytes = os
        .run(move |p| -> CaptureResult<Vec<u8>> {
            let screen = DeviceContextGuard::new(p, p.get_screen_context()?);
            let mem_id = p.create_compatible_memory_target(screen.id(), rect.width, rect.height)?;
            let mem = MemoryTargetGuard::new(p, mem_id, rect.width, rect.height);
            p.send_paint_request(handle, mem.id(), flags)?;
            p.read_back(mem.id(), rect.width, rect.height)
        })
        .await?;
    let dpi = os.run(move |p| p.query_dpi(Some(handle))).await.unwrap_or(96);
    build_buffer(bytes, rect, dpi, owned_descriptor)
}

/// Registers a thumbnail, waits a bounded time for the compositor to
/// render, reads back the destination region, and guarantees the
/// registration (and its hidden host window) are torn down on every exit
/// path via [`ThumbnailGuard`]'s `Drop` (spec.md §4.3.2).
pub(crate) async fn compositor_thumbnail(
    os: &OsWorkerHandle,
    descriptor: &WindowDescriptor,
    config: &EngineConfig,
) -> CaptureResult<PixelBuffer> {
    let handle = descriptor.handle;
    let owned_descriptor = descriptor.clone();
    let render_timeout = config.compositor_render_timeout.min(Duration::from_millis(150));
    let (bytes, w, h) = os
        .run(move |p| -> CaptureResult<(Vec<u8>, i32, i32)> {
            let host = p.create_thumbnail_host_window()?;
            let thumb_id = p.register_compositor_thumbnail(host, handle)?;
            let thumb = ThumbnailGuard::new(p, thumb_id, host);

            let (src_w, src_h) = p.query_thumbnail_source_size(thumb.id())?;
            if src_w <= 0 || src_h <= 0 {
                return Err(CaptureError::InvalidArgument("thumbnail source size is non-positive".into()));
            }
            let source_rect = Rectangle::new(0, 0, src_w, src_h);
            p.update_thumbnail(thumb.id(), source_rect, source_rect, true)?;
            std::thread::sleep(render_timeout);

            let screen = DeviceContextGuard::new(p, p.get_screen_context()?);
            let mem_id = p.create_compatible_memory_target(screen.id(), src_w, src_h)?;
            let mem = MemoryTargetGuard::new(p, mem_id, src_w, src_h);
            p.blit(mem.id(), screen.id(), source_rect)?;
            let bytes = p.read_back(mem.id(), src_w, src_h)?;
            Ok((bytes, src_w, src_h))
        })
        .await?;
    let dpi = os.run(move |p| p.query_dpi(Some(handle))).await.unwrap_or(96);
    build_buffer(bytes, Rectangle::new(0, 0, w, h), dpi, owned_descriptor)
}

/// Stealth restore: save placement, show-no-activate, wait, direct-blit,
/// reassert the original placement. The reassertion happens even if the
/// capture itself failed (spec.md §4.3.2: "if any step fails after the
/// restore, the original placement is still reasserted before returning").
pub(crate) async fn stealth_restore(
    os: &OsWorkerHandle,
    descriptor: &WindowDescriptor,
    options: &CaptureOptions,
) -> CaptureResult<PixelBuffer> {
    let handle = descriptor.handle;
    let original_placement = os.run(move |p| p.get_window_placement(handle)).await?;

    let show_result = os.run(move |p| p.show_window(handle, ShowCommand::ShowNoActivate)).await;

    let capture_result = match show_result {
        Ok(_) => {
            tokio::time::sleep(options.wait_for_visible).await;
            let live = os.run(move |p| p.describe_window(handle)).await.unwrap_or_else(|_| descriptor.clone());
            direct_blit(os, &live, options).await
        }
        Err(e) => Err(e),
    };

    let _ = os.run(move |p| p.set_window_placement(handle, original_placement)).await;
    capture_result
}

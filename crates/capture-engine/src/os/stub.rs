//! Non-Windows fallback: compiles everywhere, every operation reports
//! [`CaptureError::CompositorUnavailable`] so the rest of the engine can be
//! built, linted and unit-tested off Windows. Never used for actual capture.

use super::{CapturePrimitives, CloakFlags, ContextArea, Placement, ResourceId, ShowCommand, PaintFlags};
use capture_geom::Rectangle;
use capture_proto::{CaptureError, CaptureResult, WindowDescriptor, WindowHandle};

pub struct StubPrimitives;

impl CapturePrimitives for StubPrimitives {
    fn get_screen_context(&self) -> CaptureResult<ResourceId> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn get_window_context(&self, _handle: WindowHandle, _area: ContextArea) -> CaptureResult<ResourceId> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn release_device_context(&self, _ctx: ResourceId) {}

    fn create_compatible_memory_target(&self, _src_ctx: ResourceId, _width: i32, _height: i32) -> CaptureResult<ResourceId> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn release_memory_target(&self, _target: ResourceId) {}

    fn blit(&self, _dst: ResourceId, _src: ResourceId, _src_rect: Rectangle) -> CaptureResult<()> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn read_back(&self, _target: ResourceId, _width: i32, _height: i32) -> CaptureResult<Vec<u8>> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn create_thumbnail_host_window(&self) -> CaptureResult<WindowHandle> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn destroy_thumbnail_host_window(&self, _handle: WindowHandle) {}

    fn register_compositor_thumbnail(&self, _destination: WindowHandle, _source: WindowHandle) -> CaptureResult<ResourceId> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn update_thumbnail(&self, _thumbnail: ResourceId, _source_rect: Rectangle, _dest_rect: Rectangle, _visible: bool) -> CaptureResult<()> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn query_thumbnail_source_size(&self, _thumbnail: ResourceId) -> CaptureResult<(i32, i32)> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn unregister_thumbnail(&self, _thumbnail: ResourceId) {}

    fn send_paint_request(&self, _handle: WindowHandle, _target: ResourceId, _flags: PaintFlags) -> CaptureResult<()> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn print_window(&self, _handle: WindowHandle, _target: ResourceId, _include_frame: bool) -> CaptureResult<()> {
        Err(CaptureError::CompositorUnavailable)
    }

    fn get_window_placement(&self, _handle: WindowHandle) -> CaptureResult<Placement> {
        Err(CaptureError::WindowNotFound)
    }

    fn set_window_placement(&self, _handle: WindowHandle, _placement: Placement) -> CaptureResult<()> {
        Err(CaptureError::WindowNotFound)
    }

    fn show_window(&self, _handle: WindowHandle, _command: ShowCommand) -> CaptureResult<bool> {
        Err(CaptureError::WindowNotFound)
    }

    fn enumerate_top_level_windows(&self) -> CaptureResult<Vec<WindowDescriptor>> {
        Ok(Vec::new())
    }

    fn enumerate_thread_windows(&self, _thread_id: u32) -> CaptureResult<Vec<WindowHandle>> {
        Ok(Vec::new())
    }

    fn describe_window(&self, _handle: WindowHandle) -> CaptureResult<WindowDescriptor> {
        Err(CaptureError::WindowNotFound)
    }

    fn query_cloaked(&self, _handle: WindowHandle) -> CaptureResult<CloakFlags> {
        Ok(CloakFlags::default())
    }

    fn query_dpi(&self, _handle: Option<WindowHandle>) -> CaptureResult<u32> {
        Ok(96)
    }

    fn find_tray_processes(&self) -> Vec<u32> {
        Vec::new()
    }
}

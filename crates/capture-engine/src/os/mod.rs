//! C1: OS Capture Primitives.
//!
//! A minimal, deterministic surface over the compositor/GDI-style entry
//! points, described by contract only (spec.md §4.1). [`CapturePrimitives`]
//! is the trait/interface boundary called out in spec.md §9: porting to a
//! different compositor means implementing this trait once, nothing above
//! it changes.
//!
//! All methods are synchronous and are only ever called from the dedicated
//! OS worker thread set up in [`worker`] — see spec.md §5's OS-affinity
//! discipline.

mod guard;
mod stub;
mod worker;

#[cfg(windows)]
mod windows;

pub use guard::{DeviceContextGuard, MemoryTargetGuard, ThumbnailGuard};
pub use worker::{OsWorker, OsWorkerHandle};

use capture_geom::Rectangle;
use capture_proto::{CaptureResult, WindowDescriptor, WindowHandle};

/// Opaque handle to an OS-owned resource (device context, memory target,
/// thumbnail registration). Meaningless outside the [`CapturePrimitives`]
/// implementation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub isize);

/// Which rectangle of a window a device context or print request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextArea {
    Outer,
    Client,
}

bitflags::bitflags! {
    /// Flags for [`CapturePrimitives::send_paint_request`] (spec.md §4.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PaintFlags: u32 {
        const CLIENT = 0b0001;
        const NON_CLIENT = 0b0010;
        const CHILDREN = 0b0100;
        const OWNED = 0b1000;
    }
}

/// The `(normal rect, min-position, max-position, show-command)` tuple used
/// by stealth restore (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub normal_rect: Rectangle,
    pub min_position: (i32, i32),
    pub max_position: (i32, i32),
    pub show_command: ShowCommand,
}

/// `show_window` command (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    Hide,
    ShowNoActivate,
    Minimize,
    Restore,
    Maximize,
    ShowNormal,
}

/// Compositor-level cloak state, distinct from OS-level visibility
/// (spec.md §4.1 `query_cloaked`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloakFlags {
    pub cloaked: bool,
}

/// The platform abstraction boundary (spec.md §9). One implementation per
/// platform; [`windows::WindowsPrimitives`] on Windows, [`stub::StubPrimitives`]
/// everywhere else (compiles, but every operation reports
/// [`capture_proto::CaptureError::CompositorUnavailable`]/`OSError`).
pub trait CapturePrimitives: Send + Sync {
    fn get_screen_context(&self) -> CaptureResult<ResourceId>;
    fn get_window_context(&self, handle: WindowHandle, area: ContextArea) -> CaptureResult<ResourceId>;
    fn release_device_context(&self, ctx: ResourceId);

    fn create_compatible_memory_target(&self, src_ctx: ResourceId, width: i32, height: i32) -> CaptureResult<ResourceId>;
    fn release_memory_target(&self, target: ResourceId);

    fn blit(&self, dst: ResourceId, src: ResourceId, src_rect: Rectangle) -> CaptureResult<()>;
    /// Reads the top-down BGRA8 pixel bytes out of a memory target created
    /// by [`Self::create_compatible_memory_target`].
    fn read_back(&self, target: ResourceId, width: i32, height: i32) -> CaptureResult<Vec<u8>>;

    /// Creates the hidden window used as a thumbnail's destination.
    fn create_thumbnail_host_window(&self) -> CaptureResult<WindowHandle>;
    fn destroy_thumbnail_host_window(&self, handle: WindowHandle);

    fn register_compositor_thumbnail(&self, destination: WindowHandle, source: WindowHandle) -> CaptureResult<ResourceId>;
    fn update_thumbnail(&self, thumbnail: ResourceId, source_rect: Rectangle, dest_rect: Rectangle, visible: bool) -> CaptureResult<()>;
    fn query_thumbnail_source_size(&self, thumbnail: ResourceId) -> CaptureResult<(i32, i32)>;
    fn unregister_thumbnail(&self, thumbnail: ResourceId);

    fn send_paint_request(&self, handle: WindowHandle, target: ResourceId, flags: PaintFlags) -> CaptureResult<()>;
    /// "Print yourself to this context" (window-print method, spec.md §4.3.2), distinct from
    /// [`Self::send_paint_request`]'s synchronous message form.
    fn print_window(&self, handle: WindowHandle, target: ResourceId, include_frame: bool) -> CaptureResult<()>;

    fn get_window_placement(&self, handle: WindowHandle) -> CaptureResult<Placement>;
    fn set_window_placement(&self, handle: WindowHandle, placement: Placement) -> CaptureResult<()>;
    /// Returns the ignorable prior-visibility flag (spec.md §4.1: "not an error").
    fn show_window(&self, handle: WindowHandle, command: ShowCommand) -> CaptureResult<bool>;

    fn enumerate_top_level_windows(&self) -> CaptureResult<Vec<WindowDescriptor>>;
    fn enumerate_thread_windows(&self, thread_id: u32) -> CaptureResult<Vec<WindowHandle>>;
    fn describe_window(&self, handle: WindowHandle) -> CaptureResult<WindowDescriptor>;

    fn query_cloaked(&self, handle: WindowHandle) -> CaptureResult<CloakFlags>;
    fn query_dpi(&self, handle: Option<WindowHandle>) -> CaptureResult<u32>;

    /// Walks the shell tray hierarchy. An empty result is not an error
    /// (spec.md §9 "Tray discovery fragility") — absent intermediate levels
    /// just mean no tray apps were discovered.
    fn find_tray_processes(&self) -> Vec<u32>;
}

#[cfg(windows)]
pub fn platform_primitives() -> std::sync::Arc<dyn CapturePrimitives> {
    std::sync::Arc::new(windows::WindowsPrimitives::new())
}

#[cfg(not(windows))]
pub fn platform_primitives() -> std::sync::Arc<dyn CapturePrimitives> {
    std::sync::Arc::new(stub::StubPrimitives)
}

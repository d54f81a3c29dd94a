//! Shared test double for [`capture_engine::os::CapturePrimitives`], used by
//! every integration test in this directory so they exercise the engine
//! without a real desktop session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use capture_engine::os::{CapturePrimitives, CloakFlags, ContextArea, PaintFlags, Placement, ResourceId, ShowCommand};
use capture_geom::Rectangle;
use capture_proto::{CaptureError, CaptureResult, WindowDescriptor, WindowHandle};

/// Which of the method-specific primitive calls should fail, and how.
#[derive(Default, Clone)]
pub struct FailurePlan {
    pub blit_fails: bool,
    pub print_window_fails: bool,
    pub send_paint_fails: bool,
    pub compositor_fails: bool,
}

pub struct MockPrimitives {
    windows: Mutex<HashMap<u64, WindowDescriptor>>,
    next_resource: AtomicI64,
    /// Outstanding (unreleased) device contexts and memory targets, keyed by id.
    pub live_contexts: Mutex<std::collections::HashSet<i64>>,
    pub live_memory_targets: Mutex<std::collections::HashSet<i64>>,
    pub live_thumbnails: Mutex<std::collections::HashSet<i64>>,
    pub placements: Mutex<HashMap<u64, Placement>>,
    pub tray_pids: Mutex<Vec<u32>>,
    pub failures: FailurePlan,
}

impl MockPrimitives {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            next_resource: AtomicI64::new(1),
            live_contexts: Mutex::new(Default::default()),
            live_memory_targets: Mutex::new(Default::default()),
            live_thumbnails: Mutex::new(Default::default()),
            placements: Mutex::new(HashMap::new()),
            tray_pids: Mutex::new(Vec::new()),
            failures: FailurePlan::default(),
        }
    }

    pub fn with_failures(failures: FailurePlan) -> Self {
        Self { failures, ..Self::new() }
    }

    pub fn insert_window(&self, descriptor: WindowDescriptor) {
        self.windows.lock().unwrap().insert(descriptor.handle.0, descriptor);
    }

    fn next_id(&self) -> ResourceId {
        ResourceId(self.next_resource.fetch_add(1, Ordering::Relaxed) as isize)
    }

    pub fn placement_of(&self, handle: u64) -> Placement {
        self.placements.lock().unwrap().get(&handle).copied().unwrap_or(Placement {
            normal_rect: Rectangle::new(0, 0, 640, 480),
            min_position: (0, 0),
            max_position: (0, 0),
            show_command: ShowCommand::Minimize,
        })
    }

    /// `true` once every acquired context/memory-target/thumbnail has a
    /// matching release (testable property 1: resource balance).
    pub fn all_resources_released(&self) -> bool {
        self.live_contexts.lock().unwrap().is_empty()
            && self.live_memory_targets.lock().unwrap().is_empty()
            && self.live_thumbnails.lock().unwrap().is_empty()
    }
}

impl CapturePrimitives for MockPrimitives {
    fn get_screen_context(&self) -> CaptureResult<ResourceId> {
        let id = self.next_id();
        self.live_contexts.lock().unwrap().insert(id.0 as i64);
        Ok(id)
    }

    fn get_window_context(&self, handle: WindowHandle, _area: ContextArea) -> CaptureResult<ResourceId> {
        if !self.windows.lock().unwrap().contains_key(&handle.0) {
            return Err(CaptureError::WindowNotFound);
        }
        let id = self.next_id();
        self.live_contexts.lock().unwrap().insert(id.0 as i64);
        Ok(id)
    }

    fn release_device_context(&self, ctx: ResourceId) {
        self.live_contexts.lock().unwrap().remove(&(ctx.0 as i64));
    }

    fn create_compatible_memory_target(&self, _src_ctx: ResourceId, _width: i32, _height: i32) -> CaptureResult<ResourceId> {
        let id = self.next_id();
        self.live_memory_targets.lock().unwrap().insert(id.0 as i64);
        Ok(id)
    }

    fn release_memory_target(&self, target: ResourceId) {
        self.live_memory_targets.lock().unwrap().remove(&(target.0 as i64));
    }

    fn blit(&self, _dst: ResourceId, _src: ResourceId, _src_rect: Rectangle) -> CaptureResult<()> {
        if self.failures.blit_fails {
            return Err(CaptureError::CompositorUnavailable);
        }
        Ok(())
    }

    fn read_back(&self, _target: ResourceId, width: i32, height: i32) -> CaptureResult<Vec<u8>> {
        Ok(vec![0u8; (width * height * 4) as usize])
    }

    fn create_thumbnail_host_window(&self) -> CaptureResult<WindowHandle> {
        Ok(WindowHandle(u64::MAX))
    }

    fn destroy_thumbnail_host_window(&self, _handle: WindowHandle) {}

    fn register_compositor_thumbnail(&self, _destination: WindowHandle, _source: WindowHandle) -> CaptureResult<ResourceId> {
        if self.failures.compositor_fails {
            return Err(CaptureError::CompositorUnavailable);
        }
        let id = self.next_id();
        self.live_thumbnails.lock().unwrap().insert(id.0 as i64);
        Ok(id)
    }

    fn update_thumbnail(&self, _thumbnail: ResourceId, _source_rect: Rectangle, _dest_rect: Rectangle, _visible: bool) -> CaptureResult<()> {
        Ok(())
    }

    fn query_thumbnail_source_size(&self, _thumbnail: ResourceId) -> CaptureResult<(i32, i32)> {
        Ok((320, 240))
    }

    fn unregister_thumbnail(&self, thumbnail: ResourceId) {
        self.live_thumbnails.lock().unwrap().remove(&(thumbnail.0 as i64));
    }

    fn send_paint_request(&self, _handle: WindowHandle, _target: ResourceId, _flags: PaintFlags) -> CaptureResult<()> {
        if self.failures.send_paint_fails {
            return Err(CaptureError::CompositorUnavailable);
        }
        Ok(())
    }

    fn print_window(&self, _handle: WindowHandle, _target: ResourceId, _include_frame: bool) -> CaptureResult<()> {
        if self.failures.print_window_fails {
            return Err(CaptureError::CompositorUnavailable);
        }
        Ok(())
    }

    fn get_window_placement(&self, handle: WindowHandle) -> CaptureResult<Placement> {
        Ok(self.placements.lock().unwrap().get(&handle.0).copied().unwrap_or(Placement {
            normal_rect: Rectangle::new(0, 0, 640, 480),
            min_position: (0, 0),
            max_position: (0, 0),
            show_command: ShowCommand::Minimize,
        }))
    }

    fn set_window_placement(&self, handle: WindowHandle, placement: Placement) -> CaptureResult<()> {
        self.placements.lock().unwrap().insert(handle.0, placement);
        Ok(())
    }

    fn show_window(&self, handle: WindowHandle, command: ShowCommand) -> CaptureResult<bool> {
        if let Some(w) = self.windows.lock().unwrap().get_mut(&handle.0) {
            w.is_visible = !matches!(command, ShowCommand::Hide | ShowCommand::Minimize);
        }
        Ok(true)
    }

    fn enumerate_top_level_windows(&self) -> CaptureResult<Vec<WindowDescriptor>> {
        Ok(self.windows.lock().unwrap().values().cloned().collect())
    }

    fn enumerate_thread_windows(&self, thread_id: u32) -> CaptureResult<Vec<WindowHandle>> {
        Ok(self
            .windows
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.thread_id == thread_id)
            .map(|w| w.handle)
            .collect())
    }

    fn describe_window(&self, handle: WindowHandle) -> CaptureResult<WindowDescriptor> {
        self.windows.lock().unwrap().get(&handle.0).cloned().ok_or(CaptureError::WindowNotFound)
    }

    fn query_cloaked(&self, handle: WindowHandle) -> CaptureResult<CloakFlags> {
        let cloaked = self
            .windows
            .lock()
            .unwrap()
            .get(&handle.0)
            .map(|w| w.state == capture_proto::WindowState::Cloaked)
            .unwrap_or(false);
        Ok(CloakFlags { cloaked })
    }

    fn query_dpi(&self, _handle: Option<WindowHandle>) -> CaptureResult<u32> {
        Ok(96)
    }

    fn find_tray_processes(&self) -> Vec<u32> {
        self.tray_pids.lock().unwrap().clone()
    }
}

pub fn visible_window(handle: u64, title: &str) -> WindowDescriptor {
    WindowDescriptor {
        handle: WindowHandle(handle),
        title: title.into(),
        class_name: "TestWindowClass".into(),
        process_id: 4242,
        thread_id: 1,
        outer_rect: Rectangle::new(0, 0, 640, 480),
        client_rect: Rectangle::new(0, 0, 640, 480),
        state: capture_proto::WindowState::Visible,
        z_order: 0,
        is_visible: true,
        is_topmost: false,
        monitor_index: 0,
        in_tray: false,
    }
}

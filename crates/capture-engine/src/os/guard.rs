//! Scoped acquisition for OS resources: a guard borrows the primitives
//! implementation that created it and releases on every exit path,
//! including early returns and panics unwinding through the call that
//! holds it (spec.md §9 "Scoped resource acquisition over manual release").

use super::{CapturePrimitives, ResourceId};
use capture_proto::WindowHandle;

/// Owns a device context until dropped.
pub struct DeviceContextGuard<'p> {
    primitives: &'p (dyn CapturePrimitives + 'p),
    id: ResourceId,
}

impl<'p> DeviceContextGuard<'p> {
    pub fn new(primitives: &'p (dyn CapturePrimitives + 'p), id: ResourceId) -> Self {
        Self { primitives, id }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl Drop for DeviceContextGuard<'_> {
    fn drop(&mut self) {
        self.primitives.release_device_context(self.id);
    }
}

/// Owns a compatible memory target (bitmap + context) until dropped.
pub struct MemoryTargetGuard<'p> {
    primitives: &'p (dyn CapturePrimitives + 'p),
    id: ResourceId,
    pub width: i32,
    pub height: i32,
}

impl<'p> MemoryTargetGuard<'p> {
    pub fn new(primitives: &'p (dyn CapturePrimitives + 'p), id: ResourceId, width: i32, height: i32) -> Self {
        Self { primitives, id, width, height }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl Drop for MemoryTargetGuard<'_> {
    fn drop(&mut self) {
        self.primitives.release_memory_target(self.id);
    }
}

/// Owns a DWM thumbnail registration and its hidden destination window
/// until dropped. Unregistering the thumbnail before destroying the host
/// window matters: the reverse order can leave the compositor holding a
/// dangling destination reference.
pub struct ThumbnailGuard<'p> {
    primitives: &'p (dyn CapturePrimitives + 'p),
    id: ResourceId,
    host: WindowHandle,
}

impl<'p> ThumbnailGuard<'p> {
    pub fn new(primitives: &'p (dyn CapturePrimitives + 'p), id: ResourceId, host: WindowHandle) -> Self {
        Self { primitives, id, host }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn host(&self) -> WindowHandle {
        self.host
    }
}

impl Drop for ThumbnailGuard<'_> {
    fn drop(&mut self) {
        self.primitives.unregister_thumbnail(self.id);
        self.primitives.destroy_thumbnail_host_window(self.host);
    }
}

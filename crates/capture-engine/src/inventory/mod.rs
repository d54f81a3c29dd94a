//! C2: Window Inventory & Classification.
//!
//! Thin async wrapper around [`crate::os::CapturePrimitives::enumerate_top_level_windows`]
//! plus the target-resolution helpers used by C3. State classification
//! itself lives in `capture_proto::WindowState`/`is_system_window`; this
//! module is just enumeration, filtering, and lookup.

use capture_proto::{is_system_window, TargetSpec, WindowDescriptor, WindowFilter, WindowHandle, WindowState};

use crate::os::OsWorkerHandle;

/// Enumerates and resolves windows. Cheap to clone: it only holds the
/// worker-thread handle.
#[derive(Clone)]
pub struct WindowInventory {
    os: OsWorkerHandle,
}

impl WindowInventory {
    pub fn new(os: OsWorkerHandle) -> Self {
        Self { os }
    }

    /// All top-level windows, unfiltered.
    pub async fn enumerate(&self) -> capture_proto::CaptureResult<Vec<WindowDescriptor>> {
        self.os.run(|p| p.enumerate_top_level_windows()).await
    }

    /// All top-level windows matching `filter`.
    pub async fn enumerate_filtered(&self, filter: WindowFilter) -> capture_proto::CaptureResult<Vec<WindowDescriptor>> {
        let all = self.enumerate().await?;
        Ok(all.into_iter().filter(|d| filter.matches(d)).collect())
    }

    /// Re-reads a single window's descriptor. Callers must not cache this
    /// across calls that could have closed the window (spec.md §3).
    pub async fn describe(&self, handle: WindowHandle) -> capture_proto::CaptureResult<WindowDescriptor> {
        self.os.run(move |p| p.describe_window(handle)).await
    }

    /// First **visible, titled** window whose title contains `needle`,
    /// case-insensitively.
    pub async fn find_by_title(&self, needle: &str) -> capture_proto::CaptureResult<Option<WindowDescriptor>> {
        let needle = needle.to_lowercase();
        let all = self.enumerate().await?;
        Ok(all
            .into_iter()
            .find(|d| is_visible_and_titled(d) && d.title.to_lowercase().contains(&needle)))
    }

    /// First **visible, titled** window of the given window class.
    pub async fn find_by_class(&self, class_name: &str) -> capture_proto::CaptureResult<Option<WindowDescriptor>> {
        let class_name = class_name.to_string();
        let all = self.enumerate().await?;
        Ok(all.into_iter().find(|d| is_visible_and_titled(d) && d.class_name == class_name))
    }

    /// All windows owned by `pid`.
    ///
    /// A plain top-level scan filtered by PID misses windows owned by
    /// threads of the process that aren't themselves top-level at scan
    /// time, so this unions that scan with a per-thread walk
    /// ([`crate::os::CapturePrimitives::enumerate_thread_windows`]) over
    /// every thread already observed to own a window of this process, then
    /// deduplicates by handle.
    pub async fn enumerate_process_windows(&self, pid: u32) -> capture_proto::CaptureResult<Vec<WindowDescriptor>> {
        let all = self.enumerate().await?;
        let mut found: Vec<WindowDescriptor> = all.into_iter().filter(|d| d.process_id == pid).collect();

        let mut seen: std::collections::HashSet<u64> = found.iter().map(|d| d.handle.0).collect();
        let thread_ids: std::collections::HashSet<u32> = found.iter().map(|d| d.thread_id).collect();

        for thread_id in thread_ids {
            let handles = self.os.run(move |p| p.enumerate_thread_windows(thread_id)).await?;
            for handle in handles {
                if seen.insert(handle.0) {
                    if let Ok(descriptor) = self.describe(handle).await {
                        if descriptor.process_id == pid {
                            found.push(descriptor);
                        }
                    }
                }
            }
        }

        Ok(found)
    }

    /// Largest visible-or-titled window of `pid` (spec.md §4.2).
    pub async fn find_by_pid(&self, pid: u32) -> capture_proto::CaptureResult<Option<WindowDescriptor>> {
        Ok(self
            .enumerate_process_windows(pid)
            .await?
            .into_iter()
            .filter(|d| d.is_visible || !d.title.is_empty())
            .max_by_key(|d| d.outer_rect.width as i64 * d.outer_rect.height as i64))
    }

    pub async fn find_hidden(&self) -> capture_proto::CaptureResult<Vec<WindowDescriptor>> {
        let all = self.enumerate().await?;
        Ok(all.into_iter().filter(|d| d.state == WindowState::Hidden).collect())
    }

    pub async fn find_cloaked(&self) -> capture_proto::CaptureResult<Vec<WindowDescriptor>> {
        let all = self.enumerate().await?;
        Ok(all.into_iter().filter(|d| d.state == WindowState::Cloaked).collect())
    }

    /// Windows belonging to processes with a tray presence. An empty result
    /// is the common case, not an error: most processes have no tray icon
    /// and the tray itself may be absent on a given session.
    pub async fn find_tray(&self) -> capture_proto::CaptureResult<Vec<WindowDescriptor>> {
        let all = self.enumerate().await?;
        Ok(all.into_iter().filter(|d| d.in_tray).collect())
    }

    /// Resolves a [`TargetSpec`] to one concrete window, applying the same
    /// "first match" rule C3 documents for ambiguous specs (spec.md §6).
    pub async fn resolve(&self, target: &TargetSpec) -> capture_proto::CaptureResult<WindowDescriptor> {
        match target {
            TargetSpec::Handle(handle) => self.describe(*handle).await,
            TargetSpec::Title(title) => self
                .find_by_title(title)
                .await?
                .ok_or(capture_proto::CaptureError::WindowNotFound),
            TargetSpec::Pid(pid) => self.find_by_pid(*pid).await?.ok_or(capture_proto::CaptureError::WindowNotFound),
            TargetSpec::Class(class) => self
                .find_by_class(class)
                .await?
                .ok_or(capture_proto::CaptureError::WindowNotFound),
            TargetSpec::Desktop { .. } => Err(capture_proto::CaptureError::InvalidArgument(
                "desktop targets are resolved by the engine, not the inventory".into(),
            )),
        }
    }

    /// `true` if `descriptor` is a fixed-class-name or untitled/tiny system
    /// window that capture callers generally want excluded.
    pub fn is_system_window(descriptor: &WindowDescriptor) -> bool {
        is_system_window(descriptor)
    }
}

/// `true` for a window a title/class lookup should actually consider: one
/// that's visible and carries a non-empty title, per spec.md §4.2.
fn is_visible_and_titled(d: &WindowDescriptor) -> bool {
    d.is_visible && !d.title.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_geom::Rectangle;

    fn descriptor(title: &str, state: WindowState, in_tray: bool) -> WindowDescriptor {
        WindowDescriptor {
            handle: WindowHandle(1),
            title: title.into(),
            class_name: "SomeClass".into(),
            process_id: 100,
            thread_id: 1,
            outer_rect: Rectangle::new(0, 0, 200, 200),
            client_rect: Rectangle::new(0, 0, 200, 200),
            state,
            z_order: 0,
            is_visible: state == WindowState::Visible,
            is_topmost: false,
            monitor_index: 0,
            in_tray,
        }
    }

    #[test]
    fn system_window_delegates_to_proto() {
        let d = descriptor("", WindowState::Hidden, false);
        assert!(!WindowInventory::is_system_window(&d));
    }
}

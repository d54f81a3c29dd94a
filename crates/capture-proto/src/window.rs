use serde::{Deserialize, Serialize};

use capture_geom::Rectangle;

use crate::method::WindowState;

/// Opaque, platform-defined window handle.
///
/// On the reference OS this is an `HWND` value; it is only meaningful while
/// the window it names still exists — operations must re-validate it rather
/// than trust a cached descriptor across calls (spec.md §3, WindowDescriptor
/// lifetime note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

/// Snapshot of one window as of enumeration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub handle: WindowHandle,
    pub title: String,
    pub class_name: String,
    pub process_id: u32,
    pub thread_id: u32,
    /// Including window chrome/frame.
    pub outer_rect: Rectangle,
    /// Content area only.
    pub client_rect: Rectangle,
    pub state: WindowState,
    pub z_order: u32,
    pub is_visible: bool,
    pub is_topmost: bool,
    pub monitor_index: u32,
    /// Additional metadata tag: the window belongs to a process with a tray
    /// icon. Reported alongside `state` rather than as a `WindowState`
    /// variant (spec.md §4.2: "a window may have only one primary state").
    pub in_tray: bool,
}

/// How a caller names the thing they want captured.
///
/// Mirrors the capture façade's `target_spec` in spec.md §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    Handle(WindowHandle),
    Title(String),
    Pid(u32),
    Class(String),
    Desktop { monitor_index: u32 },
}

/// Conjunctive filter for [`crate::WindowDescriptor`] enumeration (C2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowFilter {
    pub title_contains: Option<String>,
    pub class_name_in: Option<Vec<String>>,
    pub pid_in: Option<Vec<u32>>,
    pub visible_only: bool,
    pub min_size: Option<(i32, i32)>,
    pub max_size: Option<(i32, i32)>,
    pub exclude_system: bool,
}

impl WindowFilter {
    /// `true` if `descriptor` satisfies every configured criterion.
    pub fn matches(&self, d: &WindowDescriptor) -> bool {
        if let Some(needle) = &self.title_contains {
            if !d.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(classes) = &self.class_name_in {
            if !classes.iter().any(|c| c == &d.class_name) {
                return false;
            }
        }
        if let Some(pids) = &self.pid_in {
            if !pids.contains(&d.process_id) {
                return false;
            }
        }
        if self.visible_only && d.state != WindowState::Visible {
            return false;
        }
        if let Some((w, h)) = self.min_size {
            if d.outer_rect.width < w || d.outer_rect.height < h {
                return false;
            }
        }
        if let Some((w, h)) = self.max_size {
            if d.outer_rect.width > w || d.outer_rect.height > h {
                return false;
            }
        }
        if self.exclude_system && is_system_window(d) {
            return false;
        }
        true
    }
}

/// Fixed exclusion list from spec.md §4.2: notification shells, desktop
/// workers, button shadows.
const SYSTEM_CLASS_NAMES: &[&str] = &[
    "Shell_TrayWnd",
    "Shell_SecondaryTrayWnd",
    "Progman",
    "WorkerW",
    "Button",
];

/// `true` if `d` is a "system" window per spec.md §4.2: a fixed class-name
/// exclusion list, or an untitled window smaller than 100x100.
pub fn is_system_window(d: &WindowDescriptor) -> bool {
    if SYSTEM_CLASS_NAMES.contains(&d.class_name.as_str()) {
        return true;
    }
    d.title.is_empty() && d.outer_rect.width < 100 && d.outer_rect.height < 100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(title: &str, class: &str, pid: u32, w: i32, h: i32, state: WindowState) -> WindowDescriptor {
        WindowDescriptor {
            handle: WindowHandle(1),
            title: title.into(),
            class_name: class.into(),
            process_id: pid,
            thread_id: 1,
            outer_rect: Rectangle::new(0, 0, w, h),
            client_rect: Rectangle::new(0, 0, w, h),
            state,
            z_order: 0,
            is_visible: state == WindowState::Visible,
            is_topmost: false,
            monitor_index: 0,
            in_tray: false,
        }
    }

    #[test]
    fn filter_is_a_conjunction() {
        let d = descriptor("My Editor", "EditorClass", 42, 400, 300, WindowState::Visible);
        let filter = WindowFilter {
            title_contains: Some("editor".into()),
            pid_in: Some(vec![42]),
            visible_only: true,
            ..Default::default()
        };
        assert!(filter.matches(&d));

        let filter_wrong_pid = WindowFilter {
            pid_in: Some(vec![7]),
            ..filter
        };
        assert!(!filter_wrong_pid.matches(&d));
    }

    #[test]
    fn system_window_by_class() {
        let d = descriptor("", "Shell_TrayWnd", 1, 0, 0, WindowState::Hidden);
        assert!(is_system_window(&d));
    }

    #[test]
    fn system_window_by_empty_title_and_small_size() {
        let d = descriptor("", "SomeHelperWindowClass", 1, 50, 50, WindowState::Hidden);
        assert!(is_system_window(&d));
    }

    #[test]
    fn titled_small_window_is_not_system() {
        let d = descriptor("Tiny Tool", "ToolClass", 1, 50, 50, WindowState::Hidden);
        assert!(!is_system_window(&d));
    }
}

//! Concrete Windows implementation of [`CapturePrimitives`], built directly
//! on `windows-sys`. Calling convention mirrors the teacher's `util.rs` and
//! `config/windows.rs`: bare `unsafe` blocks scoped tightly around the FFI
//! call, `GetLastError` consulted on failure, failures logged at the call
//! site rather than bubbled as panics.

use super::{CapturePrimitives, CloakFlags, ContextArea, Placement, ResourceId, ShowCommand, PaintFlags};
use capture_geom::Rectangle;
use capture_proto::{CaptureError, CaptureResult, WindowDescriptor, WindowHandle};
use std::ffi::c_void;
use std::sync::Mutex;

use windows_sys::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows_sys::Win32::Graphics::Dwm::{
    DwmGetWindowAttribute, DwmQueryThumbnailSourceSize, DwmRegisterThumbnail, DwmUnregisterThumbnail,
    DwmUpdateThumbnailProperties, DWMWA_CLOAKED, DWM_THUMBNAIL_PROPERTIES, DWM_TNP_RECTDESTINATION,
    DWM_TNP_RECTSOURCE, DWM_TNP_VISIBLE, HTHUMBNAIL,
};
use windows_sys::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits, ReleaseDC,
    SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    EnumThreadWindows, EnumWindows, FindWindowW, GetClassNameW, GetWindowLongPtrW, GetWindowPlacement,
    GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible, SendMessageW, SetWindowPlacement, ShowWindow,
    GWL_EXSTYLE, SW_HIDE, SW_MAXIMIZE, SW_MINIMIZE, SW_RESTORE, SW_SHOWNA, SW_SHOWNORMAL, WINDOWPLACEMENT,
    WM_PRINT, WS_EX_LAYERED, WS_EX_TOOLWINDOW,
};

fn last_error() -> u32 {
    unsafe { windows_sys::Win32::Foundation::GetLastError() }
}

fn os_err(op: &str) -> CaptureError {
    let code = last_error();
    tracing::error!(op, code, "win32 call failed");
    CaptureError::OSError(format!("{op} failed: error {code}"))
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn hwnd_of(handle: WindowHandle) -> HWND {
    handle.0 as isize as HWND
}

fn handle_of(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd as isize as u64)
}

fn show_command_to_win32(cmd: ShowCommand) -> i32 {
    match cmd {
        ShowCommand::Hide => SW_HIDE,
        ShowCommand::ShowNoActivate => SW_SHOWNA,
        ShowCommand::Minimize => SW_MINIMIZE,
        ShowCommand::Restore => SW_RESTORE,
        ShowCommand::Maximize => SW_MAXIMIZE,
        ShowCommand::ShowNormal => SW_SHOWNORMAL,
    }
}

fn show_command_from_win32(cmd: u32) -> ShowCommand {
    match cmd {
        x if x == SW_HIDE as u32 => ShowCommand::Hide,
        x if x == SW_MINIMIZE as u32 => ShowCommand::Minimize,
        x if x == SW_MAXIMIZE as u32 => ShowCommand::Maximize,
        x if x == SW_SHOWNORMAL as u32 => ShowCommand::ShowNormal,
        _ => ShowCommand::Restore,
    }
}

/// Thin wrapper so the hidden host windows created for DWM thumbnails use a
/// registered window class. Registration happens once, lazily.
struct HostWindowClass;

impl HostWindowClass {
    fn class_name() -> Vec<u16> {
        wide("CaptureEngineThumbnailHost")
    }

    fn ensure_registered() {
        use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows_sys::Win32::UI::WindowsAndMessaging::{RegisterClassW, WNDCLASSW};

        static REGISTERED: Mutex<bool> = Mutex::new(false);
        let mut guard = REGISTERED.lock().unwrap();
        if *guard {
            return;
        }
        unsafe extern "system" fn wndproc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
            windows_sys::Win32::UI::WindowsAndMessaging::DefWindowProcW(hwnd, msg, wparam, lparam)
        }
        unsafe {
            let hinstance = GetModuleHandleW(std::ptr::null());
            let class_name = Self::class_name();
            let wc = WNDCLASSW {
                style: 0,
                lpfnWndProc: Some(wndproc),
                cbClsExtra: 0,
                cbWndExtra: 0,
                hInstance: hinstance,
                hIcon: std::ptr::null_mut(),
                hCursor: std::ptr::null_mut(),
                hbrBackground: std::ptr::null_mut(),
                lpszMenuName: std::ptr::null(),
                lpszClassName: class_name.as_ptr(),
            };
            RegisterClassW(&wc);
        }
        *guard = true;
    }
}

pub struct WindowsPrimitives;

impl WindowsPrimitives {
    pub fn new() -> Self {
        Self
    }
}

impl CapturePrimitives for WindowsPrimitives {
    fn get_screen_context(&self) -> CaptureResult<ResourceId> {
        let hdc = unsafe { GetDC(std::ptr::null_mut()) };
        if hdc.is_null() {
            return Err(os_err("GetDC(screen)"));
        }
        Ok(ResourceId(hdc as isize))
    }

    fn get_window_context(&self, handle: WindowHandle, area: ContextArea) -> CaptureResult<ResourceId> {
        let hwnd = hwnd_of(handle);
        let hdc = match area {
            ContextArea::Client | ContextArea::Outer => unsafe { GetDC(hwnd) },
        };
        if hdc.is_null() {
            return Err(os_err("GetDC(window)"));
        }
        Ok(ResourceId(hdc as isize))
    }

    fn release_device_context(&self, ctx: ResourceId) {
        unsafe {
            ReleaseDC(std::ptr::null_mut(), ctx.0 as *mut c_void);
        }
    }

    fn create_compatible_memory_target(&self, src_ctx: ResourceId, width: i32, height: i32) -> CaptureResult<ResourceId> {
        unsafe {
            let src = src_ctx.0 as *mut c_void;
            let mem_dc = CreateCompatibleDC(src);
            if mem_dc.is_null() {
                return Err(os_err("CreateCompatibleDC"));
            }
            let bitmap = CreateCompatibleBitmap(src, width, height);
            if bitmap.is_null() {
                DeleteDC(mem_dc);
                return Err(os_err("CreateCompatibleBitmap"));
            }
            SelectObject(mem_dc, bitmap as *mut c_void);
            Ok(ResourceId(mem_dc as isize))
        }
    }

    fn release_memory_target(&self, target: ResourceId) {
        unsafe {
            DeleteDC(target.0 as *mut c_void);
        }
    }

    fn blit(&self, dst: ResourceId, src: ResourceId, src_rect: Rectangle) -> CaptureResult<()> {
        let ok = unsafe {
            BitBlt(
                dst.0 as *mut c_void,
                0,
                0,
                src_rect.width,
                src_rect.height,
                src.0 as *mut c_void,
                src_rect.x,
                src_rect.y,
                SRCCOPY,
            )
        };
        if ok == 0 {
            return Err(os_err("BitBlt"));
        }
        Ok(())
    }

    fn read_back(&self, target: ResourceId, width: i32, height: i32) -> CaptureResult<Vec<u8>> {
        let stride = (width as usize) * 4;
        let mut buf = vec![0u8; stride * height as usize];
        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB,
                biSizeImage: 0,
                biXPelsPerMeter: 0,
                biYPelsPerMeter: 0,
                biClrUsed: 0,
                biClrImportant: 0,
            },
            bmiColors: [Default::default(); 1],
        };
        let rows = unsafe {
            GetDIBits(
                target.0 as *mut c_void,
                std::ptr::null_mut(),
                0,
                height as u32,
                buf.as_mut_ptr() as *mut c_void,
                &mut info,
                DIB_RGB_COLORS,
            )
        };
        if rows == 0 {
            return Err(os_err("GetDIBits"));
        }
        Ok(buf)
    }

    fn create_thumbnail_host_window(&self) -> CaptureResult<WindowHandle> {
        HostWindowClass::ensure_registered();
        use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows_sys::Win32::UI::WindowsAndMessaging::CreateWindowExW;
        let class_name = HostWindowClass::class_name();
        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOOLWINDOW,
                class_name.as_ptr(),
                class_name.as_ptr(),
                0,
                0,
                0,
                1,
                1,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                GetModuleHandleW(std::ptr::null()),
                std::ptr::null(),
            )
        };
        if hwnd.is_null() {
            return Err(os_err("CreateWindowExW(thumbnail host)"));
        }
        Ok(handle_of(hwnd))
    }

    fn destroy_thumbnail_host_window(&self, handle: WindowHandle) {
        unsafe {
            windows_sys::Win32::UI::WindowsAndMessaging::DestroyWindow(hwnd_of(handle));
        }
    }

    fn register_compositor_thumbnail(&self, destination: WindowHandle, source: WindowHandle) -> CaptureResult<ResourceId> {
        let mut thumb: HTHUMBNAIL = 0;
        let hr = unsafe { DwmRegisterThumbnail(hwnd_of(destination), hwnd_of(source), &mut thumb) };
        if hr != 0 {
            return Err(CaptureError::OSError(format!("DwmRegisterThumbnail failed: hresult {hr:#x}")));
        }
        Ok(ResourceId(thumb as isize))
    }

    fn update_thumbnail(&self, thumbnail: ResourceId, source_rect: Rectangle, dest_rect: Rectangle, visible: bool) -> CaptureResult<()> {
        let props = DWM_THUMBNAIL_PROPERTIES {
            dwFlags: DWM_TNP_RECTDESTINATION | DWM_TNP_RECTSOURCE | DWM_TNP_VISIBLE,
            rcDestination: RECT {
                left: dest_rect.x,
                top: dest_rect.y,
                right: dest_rect.right(),
                bottom: dest_rect.bottom(),
            },
            rcSource: RECT {
                left: source_rect.x,
                top: source_rect.y,
                right: source_rect.right(),
                bottom: source_rect.bottom(),
            },
            opacity: 255,
            fVisible: visible as i32,
            fSourceClientAreaOnly: 0,
        };
        let hr = unsafe { DwmUpdateThumbnailProperties(thumbnail.0 as HTHUMBNAIL, &props) };
        if hr != 0 {
            return Err(CaptureError::OSError(format!("DwmUpdateThumbnailProperties failed: hresult {hr:#x}")));
        }
        Ok(())
    }

    fn query_thumbnail_source_size(&self, thumbnail: ResourceId) -> CaptureResult<(i32, i32)> {
        let mut size = Default::default();
        let hr = unsafe { DwmQueryThumbnailSourceSize(thumbnail.0 as HTHUMBNAIL, &mut size) };
        if hr != 0 {
            return Err(CaptureError::OSError(format!("DwmQueryThumbnailSourceSize failed: hresult {hr:#x}")));
        }
        Ok((size.cx, size.cy))
    }

    fn unregister_thumbnail(&self, thumbnail: ResourceId) {
        unsafe {
            DwmUnregisterThumbnail(thumbnail.0 as HTHUMBNAIL);
        }
    }

    fn send_paint_request(&self, handle: WindowHandle, target: ResourceId, flags: PaintFlags) -> CaptureResult<()> {
        let lparam = flags.bits() as LPARAM;
        let result = unsafe { SendMessageW(hwnd_of(handle), WM_PRINT, target.0 as WPARAM, lparam) };
        if result == 0 {
            return Err(CaptureError::CaptureFailed {
                method: capture_proto::CaptureMethod::MessagePrint,
                detail: "WM_PRINT returned 0".into(),
            });
        }
        Ok(())
    }

    fn print_window(&self, handle: WindowHandle, target: ResourceId, include_frame: bool) -> CaptureResult<()> {
        const PW_CLIENTONLY: u32 = 0x0000_0001;
        const PW_RENDERFULLCONTENT: u32 = 0x0000_0002;
        let flags = if include_frame { PW_RENDERFULLCONTENT } else { PW_CLIENTONLY | PW_RENDERFULLCONTENT };
        let ok = unsafe {
            windows_sys::Win32::UI::WindowsAndMessaging::PrintWindow(hwnd_of(handle), target.0 as *mut c_void, flags)
        };
        if ok == 0 {
            return Err(CaptureError::CaptureFailed {
                method: capture_proto::CaptureMethod::WindowPrint,
                detail: "PrintWindow returned 0".into(),
            });
        }
        Ok(())
    }

    fn get_window_placement(&self, handle: WindowHandle) -> CaptureResult<Placement> {
        let mut wp: WINDOWPLACEMENT = unsafe { std::mem::zeroed() };
        wp.length = std::mem::size_of::<WINDOWPLACEMENT>() as u32;
        let ok = unsafe { GetWindowPlacement(hwnd_of(handle), &mut wp) };
        if ok == 0 {
            return Err(CaptureError::WindowNotFound);
        }
        Ok(Placement {
            normal_rect: Rectangle::new(
                wp.rcNormalPosition.left,
                wp.rcNormalPosition.top,
                wp.rcNormalPosition.right - wp.rcNormalPosition.left,
                wp.rcNormalPosition.bottom - wp.rcNormalPosition.top,
            ),
            min_position: (wp.ptMinPosition.x, wp.ptMinPosition.y),
            max_position: (wp.ptMaxPosition.x, wp.ptMaxPosition.y),
            show_command: show_command_from_win32(wp.showCmd),
        })
    }

    fn set_window_placement(&self, handle: WindowHandle, placement: Placement) -> CaptureResult<()> {
        let wp = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            flags: 0,
            showCmd: show_command_to_win32(placement.show_command) as u32,
            ptMinPosition: windows_sys::Win32::Foundation::POINT {
                x: placement.min_position.0,
                y: placement.min_position.1,
            },
            ptMaxPosition: windows_sys::Win32::Foundation::POINT {
                x: placement.max_position.0,
                y: placement.max_position.1,
            },
            rcNormalPosition: RECT {
                left: placement.normal_rect.x,
                top: placement.normal_rect.y,
                right: placement.normal_rect.right(),
                bottom: placement.normal_rect.bottom(),
            },
        };
        let ok = unsafe { SetWindowPlacement(hwnd_of(handle), &wp) };
        if ok == 0 {
            return Err(CaptureError::WindowNotFound);
        }
        Ok(())
    }

    fn show_window(&self, handle: WindowHandle, command: ShowCommand) -> CaptureResult<bool> {
        let was_visible = unsafe { IsWindowVisible(hwnd_of(handle)) } != 0;
        unsafe {
            ShowWindow(hwnd_of(handle), show_command_to_win32(command));
        }
        Ok(was_visible)
    }

    fn enumerate_top_level_windows(&self) -> CaptureResult<Vec<WindowDescriptor>> {
        unsafe extern "system" fn callback(hwnd: HWND, lparam: LPARAM) -> windows_sys::Win32::Foundation::BOOL {
            let out = &mut *(lparam as *mut Vec<HWND>);
            out.push(hwnd);
            1
        }
        let mut handles: Vec<HWND> = Vec::new();
        unsafe {
            EnumWindows(Some(callback), &mut handles as *mut _ as LPARAM);
        }
        let descriptors = handles
            .into_iter()
            .filter_map(|h| self.describe_window(handle_of(h)).ok())
            .collect();
        Ok(descriptors)
    }

    fn enumerate_thread_windows(&self, thread_id: u32) -> CaptureResult<Vec<WindowHandle>> {
        unsafe extern "system" fn callback(hwnd: HWND, lparam: LPARAM) -> windows_sys::Win32::Foundation::BOOL {
            let out = &mut *(lparam as *mut Vec<HWND>);
            out.push(hwnd);
            1
        }
        let mut handles: Vec<HWND> = Vec::new();
        unsafe {
            EnumThreadWindows(thread_id, Some(callback), &mut handles as *mut _ as LPARAM);
        }
        Ok(handles.into_iter().map(handle_of).collect())
    }

    fn describe_window(&self, handle: WindowHandle) -> CaptureResult<WindowDescriptor> {
        let hwnd = hwnd_of(handle);
        let mut title_buf = [0u16; 512];
        let title_len = unsafe { GetWindowTextW(hwnd, title_buf.as_mut_ptr(), title_buf.len() as i32) };
        let title = String::from_utf16_lossy(&title_buf[..title_len.max(0) as usize]);

        let mut class_buf = [0u16; 256];
        let class_len = unsafe { GetClassNameW(hwnd, class_buf.as_mut_ptr(), class_buf.len() as i32) };
        let class_name = String::from_utf16_lossy(&class_buf[..class_len.max(0) as usize]);

        let mut process_id: u32 = 0;
        let thread_id = unsafe { GetWindowThreadProcessId(hwnd, &mut process_id) };

        let placement = self.get_window_placement(handle)?;
        let cloaked = self.query_cloaked(handle)?.cloaked;
        let visible = unsafe { IsWindowVisible(hwnd) } != 0;
        let _ = unsafe { GetWindowLongPtrW(hwnd, GWL_EXSTYLE) };
        let in_tray = self.find_tray_processes().contains(&process_id);

        let mut client_rect = RECT { left: 0, top: 0, right: 0, bottom: 0 };
        unsafe {
            windows_sys::Win32::UI::WindowsAndMessaging::GetClientRect(hwnd, &mut client_rect);
        }

        let state = if cloaked {
            capture_proto::WindowState::Cloaked
        } else if !visible {
            capture_proto::WindowState::Hidden
        } else {
            match placement.show_command {
                ShowCommand::Minimize => capture_proto::WindowState::Minimized,
                ShowCommand::Maximize => capture_proto::WindowState::Maximized,
                _ => capture_proto::WindowState::Visible,
            }
        };

        Ok(WindowDescriptor {
            handle,
            title,
            class_name,
            process_id,
            thread_id,
            outer_rect: placement.normal_rect,
            client_rect: Rectangle::new(0, 0, client_rect.right - client_rect.left, client_rect.bottom - client_rect.top),
            state,
            z_order: 0,
            is_visible: visible,
            is_topmost: false,
            monitor_index: 0,
            in_tray,
        })
    }

    fn query_cloaked(&self, handle: WindowHandle) -> CaptureResult<CloakFlags> {
        let mut cloaked: u32 = 0;
        let hr = unsafe {
            DwmGetWindowAttribute(
                hwnd_of(handle),
                DWMWA_CLOAKED,
                &mut cloaked as *mut _ as *mut c_void,
                std::mem::size_of::<u32>() as u32,
            )
        };
        if hr != 0 {
            return Ok(CloakFlags::default());
        }
        Ok(CloakFlags { cloaked: cloaked != 0 })
    }

    fn query_dpi(&self, handle: Option<WindowHandle>) -> CaptureResult<u32> {
        use windows_sys::Win32::UI::HiDpi::GetDpiForWindow;
        let hwnd = handle.map(hwnd_of).unwrap_or(std::ptr::null_mut());
        if hwnd.is_null() {
            return Ok(96);
        }
        let dpi = unsafe { GetDpiForWindow(hwnd) };
        Ok(if dpi == 0 { 96 } else { dpi })
    }

    fn find_tray_processes(&self) -> Vec<u32> {
        let class_name = wide("Shell_TrayWnd");
        let hwnd = unsafe { FindWindowW(class_name.as_ptr(), std::ptr::null()) };
        if hwnd.is_null() {
            return Vec::new();
        }
        let mut pid = 0u32;
        unsafe {
            GetWindowThreadProcessId(hwnd, &mut pid);
        }
        if pid == 0 {
            Vec::new()
        } else {
            vec![pid]
        }
    }
}

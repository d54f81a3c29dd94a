//! C3: Capture Engine. Resolves targets via [`WindowInventory`], runs the
//! method selector, and drives the retry/fallback chain described in
//! spec.md §4.3.

mod method_select;
mod methods;

pub use method_select::select;

use std::time::Duration;

use capture_geom::Rectangle;
use capture_proto::{
    CaptureError, CaptureMethod, CaptureOptions, CaptureResult, PixelBuffer, TargetSpec, WindowDescriptor, WindowHandle,
    WindowState,
};

use crate::config::EngineConfig;
use crate::inventory::WindowInventory;
use crate::os::OsWorkerHandle;

/// A successful fallback-chain capture, carrying the method that actually
/// produced pixels (spec.md §8 scenario c).
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub buffer: PixelBuffer,
    pub method: CaptureMethod,
}

pub struct CaptureEngine {
    os: OsWorkerHandle,
    inventory: WindowInventory,
    config: EngineConfig,
}

impl CaptureEngine {
    pub fn new(os: OsWorkerHandle, config: EngineConfig) -> Self {
        let inventory = WindowInventory::new(os.clone());
        Self { os, inventory, config }
    }

    pub fn inventory(&self) -> &WindowInventory {
        &self.inventory
    }

    pub async fn capture_by_handle(&self, handle: WindowHandle, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        let descriptor = self.inventory.describe(handle).await?;
        self.dispatch_single(&descriptor, options).await
    }

    pub async fn capture_by_title(&self, substring: &str, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        let descriptor = self.inventory.resolve(&TargetSpec::Title(substring.to_string())).await?;
        self.dispatch_single(&descriptor, options).await
    }

    pub async fn capture_by_pid(&self, pid: u32, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        let descriptor = self.inventory.resolve(&TargetSpec::Pid(pid)).await?;
        self.dispatch_single(&descriptor, options).await
    }

    pub async fn capture_by_class(&self, class_name: &str, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        let descriptor = self.inventory.resolve(&TargetSpec::Class(class_name.to_string())).await?;
        self.dispatch_single(&descriptor, options).await
    }

    /// Uses the desktop window as the capture target. `monitor_index` other
    /// than 0 on a single-monitor system fails explicitly (spec.md §4.3.3).
    pub async fn capture_full_screen(&self, monitor_index: u32, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        let desktop = self
            .inventory
            .find_by_class("#32769")
            .await?
            .ok_or(CaptureError::WindowNotFound)?;
        if monitor_index != 0 {
            return Err(CaptureError::InvalidArgument(format!(
                "monitor_index {monitor_index} requested but only the primary monitor (0) is known"
            )));
        }
        self.dispatch_single(&desktop, options).await
    }

    /// Captures the full window, then crops deterministically; method
    /// implementations are free to sub-blit directly as an optimization,
    /// but this entry point always takes the simple path (spec.md §4.3).
    pub async fn capture_region(&self, handle: WindowHandle, region: Rectangle, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        let scoped = CaptureOptions { region: Some(region), ..options.clone() };
        self.capture_by_handle(handle, &scoped).await
    }

    /// Top-level entry point: runs the full selector/fallback protocol and
    /// reports which method actually produced pixels (spec.md §8 scenario c).
    pub async fn capture_with_fallbacks(&self, handle: WindowHandle, options: &CaptureOptions) -> CaptureResult<CaptureOutcome> {
        let descriptor = self.inventory.describe(handle).await?;
        self.check_state_allowed(&descriptor, options)?;

        let client_area_is_empty = descriptor.client_rect.is_empty();
        let order = method_select::select(descriptor.state, descriptor.in_tray, client_area_is_empty, options);
        if order.is_empty() {
            return Err(CaptureError::InvalidArgument("no capture method is applicable to this window".into()));
        }

        let mut attempts = Vec::new();
        for (i, method) in order.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.method_gap).await;
            }
            match self.run_method_with_retries(*method, &descriptor, options).await {
                Ok(buffer) => return Ok(CaptureOutcome { buffer, method: *method }),
                Err(e) if e.is_locally_recoverable() => {
                    attempts.push((*method, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Err(CaptureError::AllMethodsFailed { attempts })
    }

    fn check_state_allowed(&self, descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<()> {
        let allowed = match descriptor.state {
            WindowState::Minimized => options.allow_minimized,
            WindowState::Hidden => options.allow_hidden,
            WindowState::Cloaked => options.allow_cloaked,
            WindowState::Visible | WindowState::Maximized => true,
        };
        if !allowed {
            return Err(CaptureError::AccessDenied(format!(
                "window state {:?} requires the matching allow_* option",
                descriptor.state
            )));
        }
        if descriptor.in_tray && !options.allow_tray {
            return Err(CaptureError::AccessDenied("window belongs to a tray-only process; set allow_tray".into()));
        }
        Ok(())
    }

    async fn dispatch_single(&self, descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        self.check_state_allowed(descriptor, options)?;
        self.run_method_with_retries(CaptureMethod::DirectBlit, descriptor, options).await
    }

    async fn run_method_with_retries(&self, method: CaptureMethod, descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        let attempts = 1 + options.retry_count;
        let mut last_err = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_backoff).await;
            }
            let result = self.run_method_once(method, descriptor, options).await;
            match result {
                Ok(buffer) => return Ok(buffer),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or(CaptureError::CaptureFailed { method, detail: "no attempts made".into() }))
    }

    async fn run_method_once(&self, method: CaptureMethod, descriptor: &WindowDescriptor, options: &CaptureOptions) -> CaptureResult<PixelBuffer> {
        match method {
            CaptureMethod::DirectBlit => methods::direct_blit(&self.os, descriptor, options).await,
            CaptureMethod::WindowPrint => methods::window_print(&self.os, descriptor, options).await,
            CaptureMethod::MessagePrint => methods::message_print(&self.os, descriptor, options).await,
            CaptureMethod::CompositorThumbnail => methods::compositor_thumbnail(&self.os, descriptor, &self.config).await,
            CaptureMethod::StealthRestore => methods::stealth_restore(&self.os, descriptor, options).await,
        }
        .map_err(|e| match e {
            CaptureError::CaptureFailed { .. } | CaptureError::AllMethodsFailed { .. } => e,
            other if other.is_locally_recoverable() => CaptureError::CaptureFailed { method, detail: other.to_string() },
            other => other,
        })
    }
}

/// Default capture options the streaming loop uses per tick (spec.md §4.6.1).
pub fn default_stream_capture_options() -> CaptureOptions {
    CaptureOptions {
        allow_minimized: true,
        restore_window: false,
        wait_for_visible: Duration::ZERO,
        ..Default::default()
    }
}

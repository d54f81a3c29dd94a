use serde::{Deserialize, Serialize};

/// A single capture strategy C3's selector can choose between.
///
/// Kept as a fieldless sum type rather than a string tag so the selector,
/// the dispatcher, and `CaptureOptions::preferred_method`/`fallback_methods`
/// all share one exhaustively-matchable vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMethod {
    /// Blit directly from the window's own device context. Requires the
    /// window to currently be painted on-screen.
    DirectBlit,
    /// Ask the window to print itself into an off-screen context.
    WindowPrint,
    /// Send a synchronous paint message to the window.
    MessagePrint,
    /// Render through a compositor thumbnail binding.
    CompositorThumbnail,
    /// Temporarily restore a minimized window, capture, then re-minimize.
    StealthRestore,
}

impl CaptureMethod {
    /// All methods, for validating `custom_properties`/CLI-style input against a known set.
    pub const ALL: [CaptureMethod; 5] = [
        CaptureMethod::DirectBlit,
        CaptureMethod::WindowPrint,
        CaptureMethod::MessagePrint,
        CaptureMethod::CompositorThumbnail,
        CaptureMethod::StealthRestore,
    ];
}

/// The `preferred_method` slot in [`crate::CaptureOptions`]; distinct from
/// [`CaptureMethod`] because it additionally needs an `Auto` variant meaning
/// "let the selector decide".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PreferredMethod {
    #[default]
    Auto,
    Method(CaptureMethod),
}

/// Primary visibility/compositor state of a window, as classified by C2.
///
/// A window has exactly one primary state; tray membership is reported as
/// an additional flag on [`crate::WindowDescriptor`], not as a state variant,
/// per spec.md §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowState {
    Visible,
    Minimized,
    Maximized,
    Hidden,
    Cloaked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_method_default_is_auto() {
        assert_eq!(PreferredMethod::default(), PreferredMethod::Auto);
    }

    #[test]
    fn all_methods_roundtrip_kebab_case() {
        for m in CaptureMethod::ALL {
            let s = serde_json::to_string(&m).unwrap();
            let back: CaptureMethod = serde_json::from_str(&s).unwrap();
            assert_eq!(m, back);
        }
    }
}

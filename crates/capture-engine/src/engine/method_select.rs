//! Pure method-selection function (spec.md §4.3.1). No OS access, so it is
//! exercised directly in unit tests without a desktop session — the one
//! property this module exists to guarantee is that selection is a
//! deterministic function of its inputs.

use capture_proto::{CaptureMethod, CaptureOptions, PreferredMethod, WindowState};

/// Ordered list of methods to try, given a window's classified state, its
/// tray membership, and the caller's options.
///
/// `client_area_is_empty` lets the caller flag a window with a zero-sized
/// client rectangle, on which direct-blit is "obviously inapplicable"
/// (spec.md §4.3.1) and so is never placed first or tried at all.
pub fn select(state: WindowState, in_tray: bool, client_area_is_empty: bool, options: &CaptureOptions) -> Vec<CaptureMethod> {
    let mut order = Vec::with_capacity(CaptureMethod::ALL.len() + options.fallback_methods.len());

    if let PreferredMethod::Method(m) = options.preferred_method {
        if !(m == CaptureMethod::DirectBlit && client_area_is_empty) {
            order.push(m);
        }
    }

    for m in default_order(state, in_tray) {
        if m == CaptureMethod::DirectBlit && client_area_is_empty {
            continue;
        }
        order.push(m);
    }

    for m in &options.fallback_methods {
        order.push(*m);
    }

    dedup_preserve_first(order)
}

fn default_order(state: WindowState, in_tray: bool) -> &'static [CaptureMethod] {
    use CaptureMethod::*;
    if in_tray {
        return &[CompositorThumbnail, WindowPrint, MessagePrint, DirectBlit];
    }
    match state {
        WindowState::Visible => &[DirectBlit, WindowPrint, CompositorThumbnail],
        WindowState::Minimized => &[CompositorThumbnail, WindowPrint, MessagePrint, StealthRestore],
        WindowState::Hidden => &[CompositorThumbnail, MessagePrint, WindowPrint],
        WindowState::Cloaked => &[CompositorThumbnail, MessagePrint, WindowPrint],
        WindowState::Maximized => &[DirectBlit, WindowPrint, CompositorThumbnail],
    }
}

fn dedup_preserve_first(methods: Vec<CaptureMethod>) -> Vec<CaptureMethod> {
    let mut seen = std::collections::HashSet::with_capacity(methods.len());
    methods.into_iter().filter(|m| seen.insert(*m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_default_order() {
        let opts = CaptureOptions::default();
        let order = select(WindowState::Visible, false, false, &opts);
        assert_eq!(
            order,
            vec![CaptureMethod::DirectBlit, CaptureMethod::WindowPrint, CaptureMethod::CompositorThumbnail]
        );
    }

    #[test]
    fn minimized_default_order() {
        let opts = CaptureOptions::default();
        let order = select(WindowState::Minimized, false, false, &opts);
        assert_eq!(
            order,
            vec![
                CaptureMethod::CompositorThumbnail,
                CaptureMethod::WindowPrint,
                CaptureMethod::MessagePrint,
                CaptureMethod::StealthRestore,
            ]
        );
    }

    #[test]
    fn tray_overrides_state_order() {
        let opts = CaptureOptions::default();
        let order = select(WindowState::Visible, true, false, &opts);
        assert_eq!(order[0], CaptureMethod::CompositorThumbnail);
    }

    #[test]
    fn preferred_method_is_tried_first() {
        let opts = CaptureOptions {
            preferred_method: PreferredMethod::Method(CaptureMethod::MessagePrint),
            ..Default::default()
        };
        let order = select(WindowState::Visible, false, false, &opts);
        assert_eq!(order[0], CaptureMethod::MessagePrint);
    }

    #[test]
    fn preferred_direct_blit_skipped_on_empty_client_area() {
        let opts = CaptureOptions {
            preferred_method: PreferredMethod::Method(CaptureMethod::DirectBlit),
            ..Default::default()
        };
        let order = select(WindowState::Visible, false, true, &opts);
        assert!(!order.contains(&CaptureMethod::DirectBlit));
    }

    #[test]
    fn fallback_methods_appended_in_user_order_and_deduplicated() {
        let opts = CaptureOptions {
            fallback_methods: vec![CaptureMethod::StealthRestore, CaptureMethod::DirectBlit],
            ..Default::default()
        };
        let order = select(WindowState::Visible, false, false, &opts);
        // DirectBlit already appears from the default order; user order must not duplicate it.
        assert_eq!(order.iter().filter(|m| **m == CaptureMethod::DirectBlit).count(), 1);
        assert_eq!(order.last(), Some(&CaptureMethod::StealthRestore));
    }

    #[test]
    fn selection_is_deterministic() {
        let opts = CaptureOptions::default();
        let a = select(WindowState::Hidden, false, false, &opts);
        let b = select(WindowState::Hidden, false, false, &opts);
        assert_eq!(a, b);
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dots-per-inch for a captured surface.
///
/// The OS-reported default is 96 (100% scaling). Kept as a distinct type
/// rather than a bare `u32` so density and pixel-count parameters can't be
/// swapped at a call site by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Density(pub u32);

impl Density {
    /// 96 DPI, the Windows default for 100% scaling.
    pub const DEFAULT: Density = Density(96);

    /// Scale factor relative to [`Density::DEFAULT`].
    pub fn factor(&self) -> f32 {
        self.0 as f32 / Self::DEFAULT.0 as f32
    }
}

impl Default for Density {
    fn default() -> Self {
        Self::DEFAULT
    }
}

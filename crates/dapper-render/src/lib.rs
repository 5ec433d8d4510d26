// SPDX-License-Identifier: CEPL-1.0
use raw_window_handle::{HandleError, RawDisplayHandle, RawWindowHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

/// What a GPU backend needs from the windowing layer to present into it.
///
/// The native handles must stay valid for as long as any surface created
/// from them is alive.
pub trait PresentWindow {
    /// Current framebuffer size in physical pixels.
    fn framebuffer_size(&self) -> RenderSize;
    fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError>;
    fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError>;
}

// SPDX-License-Identifier: CEPL-1.0
use anyhow::{Context, Result};
use dapper_render::{PresentWindow, RenderSize};
use raw_window_handle::{
    HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle,
};
use tracing::debug;
use winit::{dpi::PhysicalSize, event_loop::ActiveEventLoop, window::Window};

pub use winit;

#[derive(Clone, Debug)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "DapperCraft".to_owned(),
            width: 800,
            height: 600,
            resizable: false,
        }
    }
}

/// A winit window usable as a Vulkan presentation target.
pub struct PlatformWindow {
    window: Window,
}

impl PlatformWindow {
    pub fn create(event_loop: &ActiveEventLoop, settings: &WindowSettings) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(PhysicalSize::new(settings.width, settings.height))
            .with_resizable(settings.resizable);
        let window = event_loop.create_window(attrs).context("create_window")?;
        let size = window.inner_size();
        debug!(
            "window \"{}\" created ({}x{})",
            settings.title, size.width, size.height
        );
        Ok(Self { window })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl PresentWindow for PlatformWindow {
    fn framebuffer_size(&self) -> RenderSize {
        let size = self.window.inner_size();
        RenderSize {
            width: size.width,
            height: size.height,
        }
    }

    fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        Ok(self.window.display_handle()?.as_raw())
    }

    fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        Ok(self.window.window_handle()?.as_raw())
    }
}

// SPDX-License-Identifier: CEPL-1.0
//! Vulkan device bootstrap: instance, debug messenger, surface, physical
//! device ranking, logical device, swapchain and image views, torn down in
//! reverse.

mod ash_driver;
mod bootstrap;
pub mod config;
pub mod debug;
pub mod driver;
mod error;
pub mod rank;
pub mod surface;
pub mod validate;

pub use ash::vk;
pub use ash_driver::AshDriver;
pub use bootstrap::{LogicalDevice, RenderEngine, Stage, Swapchain, QUEUE_PRIORITY};
pub use config::{BootstrapConfig, DiagnosticSeverity, DiagnosticsConfig, MessageCategories};
pub use driver::Driver;
pub use error::{BootstrapError, CapabilityKind, ErrorKind, VkResultExt};

/// A bootstrap running against the system Vulkan loader.
pub type VkRenderEngine = RenderEngine<AshDriver>;

// SPDX-License-Identifier: CEPL-1.0
//! The seam between the bootstrap pipeline and the Vulkan driver.
//!
//! Handles are plain `vk` handle values. Whoever implements [`Driver`] keeps
//! whatever loader state it needs; the pipeline only ever holds handles and
//! decides when each one is created and destroyed.

use ash::vk;
use dapper_render::PresentWindow;

use crate::error::BootstrapError;

pub struct InstanceDesc<'a> {
    pub app_name: &'a str,
    pub app_version: u32,
    pub engine_name: &'a str,
    pub engine_version: u32,
    pub api_version: u32,
    pub extensions: &'a [String],
    pub layers: &'a [String],
}

#[derive(Clone, Copy, Debug)]
pub struct DebugMessengerDesc {
    pub severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    pub message_types: vk::DebugUtilsMessageTypeFlagsEXT,
}

pub struct DeviceDesc<'a> {
    /// One queue is requested from each of these families. No duplicates.
    pub queue_families: &'a [u32],
    pub queue_priority: f32,
    pub extensions: &'a [String],
    /// Ignored by current drivers, kept for older implementations.
    pub layers: &'a [String],
}

#[derive(Clone, Debug)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub image_usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    /// Only meaningful for `CONCURRENT` sharing.
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
}

/// The slice of `VkPhysicalDeviceProperties` used for ranking.
#[derive(Clone, Debug)]
pub struct PhysicalDeviceInfo {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub max_image_dimension_2d: u32,
}

pub trait Driver {
    fn instance_extensions(&self) -> Result<Vec<String>, BootstrapError>;
    fn instance_layers(&self) -> Result<Vec<String>, BootstrapError>;
    /// Instance extensions the windowing system needs to present to `window`.
    fn window_extensions(&self, window: &dyn PresentWindow) -> Result<Vec<String>, BootstrapError>;

    fn create_instance(&mut self, desc: &InstanceDesc<'_>) -> Result<vk::Instance, BootstrapError>;
    fn destroy_instance(&mut self, instance: vk::Instance);

    fn create_debug_messenger(
        &mut self,
        instance: vk::Instance,
        desc: &DebugMessengerDesc,
    ) -> Result<vk::DebugUtilsMessengerEXT, BootstrapError>;
    fn destroy_debug_messenger(
        &mut self,
        instance: vk::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    );

    fn create_surface(
        &mut self,
        instance: vk::Instance,
        window: &dyn PresentWindow,
    ) -> Result<vk::SurfaceKHR, BootstrapError>;
    fn destroy_surface(&mut self, instance: vk::Instance, surface: vk::SurfaceKHR);

    fn physical_devices(
        &self,
        instance: vk::Instance,
    ) -> Result<Vec<vk::PhysicalDevice>, BootstrapError>;
    fn physical_device_info(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<PhysicalDeviceInfo, BootstrapError>;
    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, BootstrapError>;
    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, BootstrapError>;
    fn device_extensions(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<String>, BootstrapError>;
    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, BootstrapError>;
    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, BootstrapError>;
    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, BootstrapError>;

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<vk::Device, BootstrapError>;
    fn device_queue(
        &self,
        device: vk::Device,
        queue_family: u32,
        index: u32,
    ) -> Result<vk::Queue, BootstrapError>;
    fn wait_idle(&self, device: vk::Device) -> Result<(), BootstrapError>;
    fn destroy_device(&mut self, device: vk::Device);

    fn create_swapchain(
        &mut self,
        device: vk::Device,
        desc: &SwapchainDesc,
    ) -> Result<vk::SwapchainKHR, BootstrapError>;
    fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> Result<Vec<vk::Image>, BootstrapError>;
    fn destroy_swapchain(&mut self, device: vk::Device, swapchain: vk::SwapchainKHR);

    fn create_image_view(
        &mut self,
        device: vk::Device,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> Result<vk::ImageView, BootstrapError>;
    fn destroy_image_view(&mut self, device: vk::Device, view: vk::ImageView);
}

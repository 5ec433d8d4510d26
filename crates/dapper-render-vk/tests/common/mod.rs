// SPDX-License-Identifier: CEPL-1.0
//! A scripted, recording stand-in for the Vulkan driver.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use dapper_render::{PresentWindow, RenderSize};
use dapper_render_vk::driver::{
    DebugMessengerDesc, DeviceDesc, Driver, InstanceDesc, PhysicalDeviceInfo, SwapchainDesc,
};
use dapper_render_vk::vk::{self, Handle};
use dapper_render_vk::BootstrapError;
use raw_window_handle::{HandleError, RawDisplayHandle, RawWindowHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Object {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Swapchain,
    ImageView,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Created(Object, u64),
    Destroyed(Object, u64),
    /// A per-device query, tagged with the device's index.
    Queried(&'static str, usize),
    WaitIdle,
}

#[derive(Default)]
pub struct Recorded {
    pub events: Vec<Event>,
    pub instance_extensions: Vec<String>,
    pub instance_layers: Vec<String>,
    pub debug_messenger: Option<DebugMessengerDesc>,
    pub device_index: Option<usize>,
    pub device_queue_families: Vec<u32>,
    pub device_queue_priority: Option<f32>,
    pub device_extensions: Vec<String>,
    pub swapchain: Option<SwapchainDesc>,
    pub image_views: Vec<vk::ImageViewCreateInfo<'static>>,
}

impl Recorded {
    pub fn created(&self) -> Vec<(Object, u64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Created(o, h) => Some((*o, *h)),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<(Object, u64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Destroyed(o, h) => Some((*o, *h)),
                _ => None,
            })
            .collect()
    }

    pub fn queries(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Queried(..)))
            .count()
    }
}

#[derive(Clone, Debug)]
pub struct FakeDevice {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub max_image_dimension_2d: u32,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub present_families: Vec<u32>,
    pub extensions: Vec<String>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

pub fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

impl FakeDevice {
    /// A device that passes every check, with one combined family.
    pub fn new(name: &str, device_type: vk::PhysicalDeviceType, max_dim: u32) -> Self {
        Self {
            name: name.to_owned(),
            device_type,
            max_image_dimension_2d: max_dim,
            queue_families: vec![family(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            )],
            present_families: vec![0],
            extensions: vec!["VK_KHR_swapchain".into(), "VK_KHR_maintenance1".into()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::STORAGE
                    | vk::ImageUsageFlags::TRANSFER_DST,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    pub fn discrete(name: &str, max_dim: u32) -> Self {
        Self::new(name, vk::PhysicalDeviceType::DISCRETE_GPU, max_dim)
    }

    pub fn integrated(name: &str, max_dim: u32) -> Self {
        Self::new(name, vk::PhysicalDeviceType::INTEGRATED_GPU, max_dim)
    }
}

pub struct MockDriver {
    pub instance_extensions: Vec<String>,
    pub instance_layers: Vec<String>,
    pub window_extensions: Vec<String>,
    pub devices: Vec<FakeDevice>,
    pub swapchain_images: usize,
    /// Image view creation fails on this call (0-based).
    pub fail_image_view_at: Option<usize>,
    pub fail_instance: bool,
    pub fail_debug_messenger: bool,
    pub fail_surface: bool,
    pub fail_device: bool,
    pub fail_device_queue: bool,
    pub fail_swapchain: bool,
    pub record: Rc<RefCell<Recorded>>,
    next_handle: u64,
    image_view_calls: usize,
}

impl MockDriver {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            instance_extensions: vec![
                "VK_KHR_surface".into(),
                "VK_KHR_xcb_surface".into(),
                "VK_EXT_debug_utils".into(),
            ],
            instance_layers: vec!["VK_LAYER_KHRONOS_validation".into()],
            window_extensions: vec!["VK_KHR_surface".into(), "VK_KHR_xcb_surface".into()],
            devices,
            swapchain_images: 3,
            fail_image_view_at: None,
            fail_instance: false,
            fail_debug_messenger: false,
            fail_surface: false,
            fail_device: false,
            fail_device_queue: false,
            fail_swapchain: false,
            record: Rc::new(RefCell::new(Recorded::default())),
            next_handle: 0x100,
            image_view_calls: 0,
        }
    }

    pub fn record(&self) -> Rc<RefCell<Recorded>> {
        Rc::clone(&self.record)
    }

    fn alloc(&mut self, object: Object) -> u64 {
        self.next_handle += 1;
        let handle = self.next_handle;
        self.record
            .borrow_mut()
            .events
            .push(Event::Created(object, handle));
        handle
    }

    fn release(&mut self, object: Object, handle: u64) {
        self.record
            .borrow_mut()
            .events
            .push(Event::Destroyed(object, handle));
    }

    fn device(&self, physical_device: vk::PhysicalDevice, query: &'static str) -> &FakeDevice {
        let index = device_index(physical_device);
        self.record
            .borrow_mut()
            .events
            .push(Event::Queried(query, index));
        &self.devices[index]
    }
}

fn failure(call: &'static str, result: vk::Result) -> BootstrapError {
    BootstrapError::Driver { call, result }
}

fn device_index(physical_device: vk::PhysicalDevice) -> usize {
    physical_device.as_raw() as usize - 1
}

impl Driver for MockDriver {
    fn instance_extensions(&self) -> Result<Vec<String>, BootstrapError> {
        Ok(self.instance_extensions.clone())
    }

    fn instance_layers(&self) -> Result<Vec<String>, BootstrapError> {
        Ok(self.instance_layers.clone())
    }

    fn window_extensions(&self, _window: &dyn PresentWindow) -> Result<Vec<String>, BootstrapError> {
        Ok(self.window_extensions.clone())
    }

    fn create_instance(&mut self, desc: &InstanceDesc<'_>) -> Result<vk::Instance, BootstrapError> {
        {
            let mut record = self.record.borrow_mut();
            record.instance_extensions = desc.extensions.to_vec();
            record.instance_layers = desc.layers.to_vec();
        }
        if self.fail_instance {
            return Err(failure(
                "vkCreateInstance",
                vk::Result::ERROR_INCOMPATIBLE_DRIVER,
            ));
        }
        Ok(vk::Instance::from_raw(self.alloc(Object::Instance)))
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.release(Object::Instance, instance.as_raw());
    }

    fn create_debug_messenger(
        &mut self,
        _instance: vk::Instance,
        desc: &DebugMessengerDesc,
    ) -> Result<vk::DebugUtilsMessengerEXT, BootstrapError> {
        self.record.borrow_mut().debug_messenger = Some(*desc);
        if self.fail_debug_messenger {
            return Err(failure(
                "vkCreateDebugUtilsMessengerEXT",
                vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            ));
        }
        Ok(vk::DebugUtilsMessengerEXT::from_raw(
            self.alloc(Object::DebugMessenger),
        ))
    }

    fn destroy_debug_messenger(
        &mut self,
        _instance: vk::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    ) {
        self.release(Object::DebugMessenger, messenger.as_raw());
    }

    fn create_surface(
        &mut self,
        _instance: vk::Instance,
        _window: &dyn PresentWindow,
    ) -> Result<vk::SurfaceKHR, BootstrapError> {
        if self.fail_surface {
            return Err(failure(
                "create_surface",
                vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR,
            ));
        }
        Ok(vk::SurfaceKHR::from_raw(self.alloc(Object::Surface)))
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        self.release(Object::Surface, surface.as_raw());
    }

    fn physical_devices(
        &self,
        _instance: vk::Instance,
    ) -> Result<Vec<vk::PhysicalDevice>, BootstrapError> {
        Ok((1..=self.devices.len() as u64)
            .map(vk::PhysicalDevice::from_raw)
            .collect())
    }

    fn physical_device_info(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<PhysicalDeviceInfo, BootstrapError> {
        let d = self.device(physical_device, "info");
        Ok(PhysicalDeviceInfo {
            name: d.name.clone(),
            device_type: d.device_type,
            max_image_dimension_2d: d.max_image_dimension_2d,
        })
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, BootstrapError> {
        Ok(self
            .device(physical_device, "queue_families")
            .queue_families
            .clone())
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> Result<bool, BootstrapError> {
        Ok(self
            .device(physical_device, "surface_support")
            .present_families
            .contains(&queue_family))
    }

    fn device_extensions(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<String>, BootstrapError> {
        Ok(self
            .device(physical_device, "device_extensions")
            .extensions
            .clone())
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, BootstrapError> {
        Ok(self.device(physical_device, "surface_capabilities").capabilities)
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, BootstrapError> {
        Ok(self.device(physical_device, "surface_formats").formats.clone())
    }

    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, BootstrapError> {
        Ok(self
            .device(physical_device, "surface_present_modes")
            .present_modes
            .clone())
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<vk::Device, BootstrapError> {
        {
            let mut record = self.record.borrow_mut();
            record.device_index = Some(device_index(physical_device));
            record.device_queue_families = desc.queue_families.to_vec();
            record.device_queue_priority = Some(desc.queue_priority);
            record.device_extensions = desc.extensions.to_vec();
        }
        if self.fail_device {
            return Err(failure("vkCreateDevice", vk::Result::ERROR_DEVICE_LOST));
        }
        Ok(vk::Device::from_raw(self.alloc(Object::Device)))
    }

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family: u32,
        index: u32,
    ) -> Result<vk::Queue, BootstrapError> {
        if self.fail_device_queue {
            return Err(failure("vkGetDeviceQueue", vk::Result::ERROR_DEVICE_LOST));
        }
        Ok(vk::Queue::from_raw(
            (device.as_raw() << 16) | (u64::from(queue_family) << 8) | u64::from(index),
        ))
    }

    fn wait_idle(&self, _device: vk::Device) -> Result<(), BootstrapError> {
        self.record.borrow_mut().events.push(Event::WaitIdle);
        Ok(())
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.release(Object::Device, device.as_raw());
    }

    fn create_swapchain(
        &mut self,
        _device: vk::Device,
        desc: &SwapchainDesc,
    ) -> Result<vk::SwapchainKHR, BootstrapError> {
        self.record.borrow_mut().swapchain = Some(desc.clone());
        if self.fail_swapchain {
            return Err(failure(
                "vkCreateSwapchainKHR",
                vk::Result::ERROR_INITIALIZATION_FAILED,
            ));
        }
        Ok(vk::SwapchainKHR::from_raw(self.alloc(Object::Swapchain)))
    }

    fn swapchain_images(
        &self,
        _device: vk::Device,
        _swapchain: vk::SwapchainKHR,
    ) -> Result<Vec<vk::Image>, BootstrapError> {
        Ok((0..self.swapchain_images as u64)
            .map(|i| vk::Image::from_raw(0xA000 + i))
            .collect())
    }

    fn destroy_swapchain(&mut self, _device: vk::Device, swapchain: vk::SwapchainKHR) {
        self.release(Object::Swapchain, swapchain.as_raw());
    }

    fn create_image_view(
        &mut self,
        _device: vk::Device,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> Result<vk::ImageView, BootstrapError> {
        let call = self.image_view_calls;
        self.image_view_calls += 1;
        if self.fail_image_view_at == Some(call) {
            return Err(failure(
                "vkCreateImageView",
                vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            ));
        }
        let copy = vk::ImageViewCreateInfo {
            image: info.image,
            view_type: info.view_type,
            format: info.format,
            components: info.components,
            subresource_range: info.subresource_range,
            ..Default::default()
        };
        self.record.borrow_mut().image_views.push(copy);
        Ok(vk::ImageView::from_raw(self.alloc(Object::ImageView)))
    }

    fn destroy_image_view(&mut self, _device: vk::Device, view: vk::ImageView) {
        self.release(Object::ImageView, view.as_raw());
    }
}

pub struct TestWindow(pub RenderSize);

impl TestWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self(RenderSize { width, height })
    }
}

impl PresentWindow for TestWindow {
    fn framebuffer_size(&self) -> RenderSize {
        self.0
    }

    fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        Err(HandleError::Unavailable)
    }

    fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        Err(HandleError::Unavailable)
    }
}

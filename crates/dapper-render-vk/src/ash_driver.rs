// SPDX-License-Identifier: CEPL-1.0
//! [`Driver`] backed by the system Vulkan loader through `ash`.

use std::ffi::{c_char, CStr, CString};

use ash::ext::debug_utils;
use ash::khr::{surface, swapchain};
use ash::vk;
use ash::{Entry, Instance};
use dapper_render::PresentWindow;

use crate::debug::debug_callback;
use crate::driver::{
    DebugMessengerDesc, DeviceDesc, Driver, InstanceDesc, PhysicalDeviceInfo, SwapchainDesc,
};
use crate::error::{BootstrapError, VkResultExt};

struct InstanceState {
    instance: Instance,
    surface_loader: surface::Instance,
    /// Resolved once at instance creation, only when the debug extension is
    /// enabled.
    debug_utils: Option<debug_utils::Instance>,
}

struct DeviceState {
    device: ash::Device,
    swapchain_loader: swapchain::Device,
}

pub struct AshDriver {
    entry: Entry,
    instance: Option<InstanceState>,
    device: Option<DeviceState>,
}

impl AshDriver {
    pub fn new() -> Self {
        Self {
            entry: Entry::linked(),
            instance: None,
            device: None,
        }
    }

    fn instance_state(&self) -> Result<&InstanceState, BootstrapError> {
        self.instance
            .as_ref()
            .ok_or(BootstrapError::OutOfOrder("instance"))
    }

    fn device_state(&self, device: vk::Device) -> Result<&DeviceState, BootstrapError> {
        self.device
            .as_ref()
            .filter(|d| d.device.handle() == device)
            .ok_or(BootstrapError::OutOfOrder("device"))
    }
}

impl Default for AshDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn c_names(names: &[String]) -> Result<Vec<CString>, BootstrapError> {
    names
        .iter()
        .map(|n| CString::new(n.as_str()).map_err(|_| BootstrapError::InvalidName(n.clone())))
        .collect()
}

fn c_str_name(name: Result<&CStr, std::ffi::FromBytesUntilNulError>) -> String {
    name.map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Driver for AshDriver {
    fn instance_extensions(&self) -> Result<Vec<String>, BootstrapError> {
        let props = unsafe { self.entry.enumerate_instance_extension_properties(None) }
            .during("vkEnumerateInstanceExtensionProperties")?;
        Ok(props
            .iter()
            .map(|p| c_str_name(p.extension_name_as_c_str()))
            .collect())
    }

    fn instance_layers(&self) -> Result<Vec<String>, BootstrapError> {
        let props = unsafe { self.entry.enumerate_instance_layer_properties() }
            .during("vkEnumerateInstanceLayerProperties")?;
        Ok(props
            .iter()
            .map(|p| c_str_name(p.layer_name_as_c_str()))
            .collect())
    }

    fn window_extensions(&self, window: &dyn PresentWindow) -> Result<Vec<String>, BootstrapError> {
        let display = window.raw_display_handle()?;
        let names = ash_window::enumerate_required_extensions(display)
            .during("enumerate_required_extensions")?;
        Ok(names
            .iter()
            // SAFETY: ash-window returns pointers to static nul-terminated names.
            .map(|&p| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
            .collect())
    }

    fn create_instance(&mut self, desc: &InstanceDesc<'_>) -> Result<vk::Instance, BootstrapError> {
        let app_name = CString::new(desc.app_name)
            .map_err(|_| BootstrapError::InvalidName(desc.app_name.to_owned()))?;
        let engine_name = CString::new(desc.engine_name)
            .map_err(|_| BootstrapError::InvalidName(desc.engine_name.to_owned()))?;
        let extensions = c_names(desc.extensions)?;
        let layers = c_names(desc.layers)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(desc.app_version)
            .engine_name(&engine_name)
            .engine_version(desc.engine_version)
            .api_version(desc.api_version);
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { self.entry.create_instance(&create_info, None) }
            .during("vkCreateInstance")?;

        let debug_enabled = desc
            .extensions
            .iter()
            .any(|e| e.as_bytes() == debug_utils::NAME.to_bytes());
        let handle = instance.handle();
        self.instance = Some(InstanceState {
            surface_loader: surface::Instance::new(&self.entry, &instance),
            debug_utils: debug_enabled.then(|| debug_utils::Instance::new(&self.entry, &instance)),
            instance,
        });
        Ok(handle)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        if let Some(state) = self.instance.take() {
            debug_assert_eq!(state.instance.handle(), instance);
            unsafe { state.instance.destroy_instance(None) };
        }
    }

    fn create_debug_messenger(
        &mut self,
        _instance: vk::Instance,
        desc: &DebugMessengerDesc,
    ) -> Result<vk::DebugUtilsMessengerEXT, BootstrapError> {
        let loader = self
            .instance_state()?
            .debug_utils
            .as_ref()
            .ok_or(BootstrapError::Driver {
                call: "vkCreateDebugUtilsMessengerEXT",
                result: vk::Result::ERROR_EXTENSION_NOT_PRESENT,
            })?;
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(desc.severity)
            .message_type(desc.message_types)
            .pfn_user_callback(Some(debug_callback));
        unsafe { loader.create_debug_utils_messenger(&create_info, None) }
            .during("vkCreateDebugUtilsMessengerEXT")
    }

    fn destroy_debug_messenger(
        &mut self,
        _instance: vk::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    ) {
        if let Some(loader) = self.instance.as_ref().and_then(|s| s.debug_utils.as_ref()) {
            unsafe { loader.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn create_surface(
        &mut self,
        _instance: vk::Instance,
        window: &dyn PresentWindow,
    ) -> Result<vk::SurfaceKHR, BootstrapError> {
        let display = window.raw_display_handle()?;
        let handle = window.raw_window_handle()?;
        let state = self.instance_state()?;
        // SAFETY: the window outlives the engine that owns this surface.
        unsafe { ash_window::create_surface(&self.entry, &state.instance, display, handle, None) }
            .during("create_surface")
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        if let Some(state) = &self.instance {
            unsafe { state.surface_loader.destroy_surface(surface, None) };
        }
    }

    fn physical_devices(
        &self,
        _instance: vk::Instance,
    ) -> Result<Vec<vk::PhysicalDevice>, BootstrapError> {
        unsafe { self.instance_state()?.instance.enumerate_physical_devices() }
            .during("vkEnumeratePhysicalDevices")
    }

    fn physical_device_info(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<PhysicalDeviceInfo, BootstrapError> {
        let props = unsafe {
            self.instance_state()?
                .instance
                .get_physical_device_properties(physical_device)
        };
        Ok(PhysicalDeviceInfo {
            name: c_str_name(props.device_name_as_c_str()),
            device_type: props.device_type,
            max_image_dimension_2d: props.limits.max_image_dimension2_d,
        })
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, BootstrapError> {
        Ok(unsafe {
            self.instance_state()?
                .instance
                .get_physical_device_queue_family_properties(physical_device)
        })
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, BootstrapError> {
        unsafe {
            self.instance_state()?
                .surface_loader
                .get_physical_device_surface_support(physical_device, queue_family, surface)
        }
        .during("vkGetPhysicalDeviceSurfaceSupportKHR")
    }

    fn device_extensions(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<String>, BootstrapError> {
        let props = unsafe {
            self.instance_state()?
                .instance
                .enumerate_device_extension_properties(physical_device)
        }
        .during("vkEnumerateDeviceExtensionProperties")?;
        Ok(props
            .iter()
            .map(|p| c_str_name(p.extension_name_as_c_str()))
            .collect())
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, BootstrapError> {
        unsafe {
            self.instance_state()?
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
        .during("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, BootstrapError> {
        unsafe {
            self.instance_state()?
                .surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
        }
        .during("vkGetPhysicalDeviceSurfaceFormatsKHR")
    }

    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, BootstrapError> {
        unsafe {
            self.instance_state()?
                .surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
        }
        .during("vkGetPhysicalDeviceSurfacePresentModesKHR")
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<vk::Device, BootstrapError> {
        let extensions = c_names(desc.extensions)?;
        let layers = c_names(desc.layers)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        let priorities = [desc.queue_priority];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo<'_>> = desc
            .queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();
        let features = vk::PhysicalDeviceFeatures::default();

        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo {
            enabled_layer_count: layer_ptrs.len() as u32,
            pp_enabled_layer_names: layer_ptrs.as_ptr(),
            ..Default::default()
        }
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extension_ptrs)
        .enabled_features(&features);

        let state = self.instance_state()?;
        let device = unsafe {
            state
                .instance
                .create_device(physical_device, &create_info, None)
        }
        .during("vkCreateDevice")?;
        let swapchain_loader = swapchain::Device::new(&state.instance, &device);
        let handle = device.handle();
        self.device = Some(DeviceState {
            device,
            swapchain_loader,
        });
        Ok(handle)
    }

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family: u32,
        index: u32,
    ) -> Result<vk::Queue, BootstrapError> {
        let state = self.device_state(device)?;
        Ok(unsafe { state.device.get_device_queue(queue_family, index) })
    }

    fn wait_idle(&self, device: vk::Device) -> Result<(), BootstrapError> {
        let state = self.device_state(device)?;
        unsafe { state.device.device_wait_idle() }.during("vkDeviceWaitIdle")
    }

    fn destroy_device(&mut self, device: vk::Device) {
        if let Some(state) = self.device.take() {
            debug_assert_eq!(state.device.handle(), device);
            unsafe { state.device.destroy_device(None) };
        }
    }

    fn create_swapchain(
        &mut self,
        device: vk::Device,
        desc: &SwapchainDesc,
    ) -> Result<vk::SwapchainKHR, BootstrapError> {
        let state = self.device_state(device)?;
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(desc.surface)
            .min_image_count(desc.min_image_count)
            .image_format(desc.format.format)
            .image_color_space(desc.format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(desc.image_usage)
            .image_sharing_mode(desc.sharing_mode)
            .pre_transform(desc.pre_transform)
            .composite_alpha(desc.composite_alpha)
            .present_mode(desc.present_mode)
            .clipped(desc.clipped)
            .old_swapchain(vk::SwapchainKHR::null());
        if desc.sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(&desc.queue_family_indices);
        }
        unsafe { state.swapchain_loader.create_swapchain(&create_info, None) }
            .during("vkCreateSwapchainKHR")
    }

    fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> Result<Vec<vk::Image>, BootstrapError> {
        let state = self.device_state(device)?;
        unsafe { state.swapchain_loader.get_swapchain_images(swapchain) }
            .during("vkGetSwapchainImagesKHR")
    }

    fn destroy_swapchain(&mut self, device: vk::Device, swapchain: vk::SwapchainKHR) {
        if let Ok(state) = self.device_state(device) {
            unsafe { state.swapchain_loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(
        &mut self,
        device: vk::Device,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> Result<vk::ImageView, BootstrapError> {
        let state = self.device_state(device)?;
        unsafe { state.device.create_image_view(info, None) }.during("vkCreateImageView")
    }

    fn destroy_image_view(&mut self, device: vk::Device, view: vk::ImageView) {
        if let Ok(state) = self.device_state(device) {
            unsafe { state.device.destroy_image_view(view, None) };
        }
    }
}

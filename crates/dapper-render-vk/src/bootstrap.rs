// SPDX-License-Identifier: CEPL-1.0
//! The ordered device bootstrap and its teardown.
//!
//! Each stage consumes the handles of the ones before it. Handles live in
//! `Option`s filled only by the stage that creates them, and [`Stage`]
//! records how far the chain got. Teardown walks the same record backwards,
//! so a bootstrap that fails half-way still releases exactly what it made.

use ash::vk;
use dapper_render::PresentWindow;
use tracing::{debug, info, trace, warn};

use crate::config::BootstrapConfig;
use crate::driver::{DebugMessengerDesc, DeviceDesc, Driver, InstanceDesc, SwapchainDesc};
use crate::error::{BootstrapError, CapabilityKind};
use crate::rank::{self, QueueFamilyIndices, SelectedDevice, SwapchainSupport};
use crate::surface;
use crate::validate;

/// Priority given to every requested queue.
pub const QUEUE_PRIORITY: f32 = 0.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Uninitialized,
    InstanceReady,
    DebugReady,
    SurfaceReady,
    PhysicalDeviceSelected,
    LogicalDeviceReady,
    SwapchainReady,
    ImageViewsReady,
    Ready,
}

#[derive(Clone, Copy, Debug)]
pub struct LogicalDevice {
    pub handle: vk::Device,
    pub queue_families: QueueFamilyIndices,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

#[derive(Clone, Debug)]
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub images: Vec<vk::Image>,
}

/// A Vulkan instance, device and swapchain brought up for one window.
///
/// The window passed to [`RenderEngine::new`] must outlive the engine: the
/// surface stays bound to its native handle until the engine is dropped.
pub struct RenderEngine<D: Driver> {
    driver: D,
    config: BootstrapConfig,
    stage: Stage,

    instance: Option<vk::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: Option<vk::SurfaceKHR>,
    physical_device: Option<SelectedDevice>,
    device: Option<LogicalDevice>,
    swapchain: Option<Swapchain>,
    image_views: Vec<vk::ImageView>,
}

impl<D: Driver> RenderEngine<D> {
    /// Runs the whole chain. On error every handle created so far has
    /// already been released when this returns.
    pub fn new(
        driver: D,
        config: BootstrapConfig,
        window: &dyn PresentWindow,
    ) -> Result<Self, BootstrapError> {
        let mut engine = Self {
            driver,
            config,
            stage: Stage::Uninitialized,
            instance: None,
            debug_messenger: None,
            surface: None,
            physical_device: None,
            device: None,
            swapchain: None,
            image_views: Vec::new(),
        };

        debug!("initializing render engine");
        engine.create_instance(window)?;
        engine.create_debug_messenger()?;
        engine.create_surface(window)?;
        engine.pick_physical_device()?;
        engine.create_logical_device()?;
        engine.create_swapchain(window)?;
        engine.create_image_views()?;
        engine.advance(Stage::Ready);

        if let (Some(pd), Some(sc)) = (&engine.physical_device, &engine.swapchain) {
            info!(
                "Vulkan ready on {} ({}x{}, {:?}, {:?}, {} images)",
                pd.info.name,
                sc.extent.width,
                sc.extent.height,
                sc.format.format,
                sc.present_mode,
                sc.images.len()
            );
        }
        Ok(engine)
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "{:?} -> {next:?}", self.stage);
        trace!("stage {:?} -> {next:?}", self.stage);
        self.stage = next;
    }

    fn create_instance(&mut self, window: &dyn PresentWindow) -> Result<(), BootstrapError> {
        debug!("creating instance");
        let available = self.driver.instance_extensions()?;
        let window_extensions = self.driver.window_extensions(window)?;
        let extensions = self.config.required_instance_extensions(&window_extensions);
        validate::require_all(CapabilityKind::InstanceExtension, &extensions, &available)?;

        let layers = self.config.enabled_layers();
        if self.config.diagnostics.enabled {
            debug!("validation layers enabled");
            let available = self.driver.instance_layers()?;
            validate::require_all(CapabilityKind::InstanceLayer, &layers, &available)?;
        } else {
            debug!("validation layers disabled");
        }

        let desc = InstanceDesc {
            app_name: &self.config.app_name,
            app_version: self.config.app_version,
            engine_name: &self.config.engine_name,
            engine_version: self.config.engine_version,
            api_version: self.config.api_version,
            extensions: &extensions,
            layers: &layers,
        };
        self.instance = Some(self.driver.create_instance(&desc)?);
        self.advance(Stage::InstanceReady);
        Ok(())
    }

    fn create_debug_messenger(&mut self) -> Result<(), BootstrapError> {
        if !self.config.diagnostics.enabled {
            return Ok(());
        }
        debug!("creating debug messenger");
        let instance = self.instance.ok_or(BootstrapError::OutOfOrder("instance"))?;
        let desc = DebugMessengerDesc {
            severity: self.config.diagnostics.min_severity.flags(),
            message_types: self.config.diagnostics.categories.flags(),
        };
        self.debug_messenger = Some(self.driver.create_debug_messenger(instance, &desc)?);
        self.advance(Stage::DebugReady);
        Ok(())
    }

    fn create_surface(&mut self, window: &dyn PresentWindow) -> Result<(), BootstrapError> {
        debug!("creating surface");
        let instance = self.instance.ok_or(BootstrapError::OutOfOrder("instance"))?;
        self.surface = Some(self.driver.create_surface(instance, window)?);
        self.advance(Stage::SurfaceReady);
        Ok(())
    }

    fn pick_physical_device(&mut self) -> Result<(), BootstrapError> {
        debug!("choosing physical device");
        let instance = self.instance.ok_or(BootstrapError::OutOfOrder("instance"))?;
        let surface = self.surface.ok_or(BootstrapError::OutOfOrder("surface"))?;
        let selected = rank::pick_physical_device(&self.driver, instance, surface, &self.config)?;
        self.physical_device = Some(selected);
        self.advance(Stage::PhysicalDeviceSelected);
        Ok(())
    }

    fn create_logical_device(&mut self) -> Result<(), BootstrapError> {
        debug!("creating logical device");
        let physical_device = self.selected()?;
        let surface = self.surface.ok_or(BootstrapError::OutOfOrder("surface"))?;

        // Recomputed for the selected device, never carried over from ranking.
        let queue_families = rank::find_queue_families(
            &self.driver,
            physical_device,
            surface,
            self.config.queue_requirement,
        )?;
        let (graphics, present) = queue_families
            .pair()
            .ok_or(BootstrapError::NoSuitableDevice { candidates: 1 })?;

        let unique = queue_families.unique();
        let layers = self.config.enabled_layers();
        let desc = DeviceDesc {
            queue_families: &unique,
            queue_priority: QUEUE_PRIORITY,
            extensions: &self.config.device_extensions,
            layers: &layers,
        };
        let handle = self.driver.create_device(physical_device, &desc)?;
        // Stored before the queue lookups so a failure below still destroys it.
        self.device = Some(LogicalDevice {
            handle,
            queue_families,
            graphics_queue: vk::Queue::null(),
            present_queue: vk::Queue::null(),
        });

        let graphics_queue = self.driver.device_queue(handle, graphics, 0)?;
        let present_queue = self.driver.device_queue(handle, present, 0)?;
        if let Some(device) = &mut self.device {
            device.graphics_queue = graphics_queue;
            device.present_queue = present_queue;
        }
        trace!("queues ready (graphics family {graphics}, present family {present})");
        self.advance(Stage::LogicalDeviceReady);
        Ok(())
    }

    fn create_swapchain(&mut self, window: &dyn PresentWindow) -> Result<(), BootstrapError> {
        debug!("creating swapchain");
        let physical_device = self.selected()?;
        let surface = self.surface.ok_or(BootstrapError::OutOfOrder("surface"))?;
        let device = self.device.ok_or(BootstrapError::OutOfOrder("device"))?;

        let support = SwapchainSupport::query(&self.driver, physical_device, surface)?;
        let format = surface::choose_surface_format(&support.formats).ok_or(
            BootstrapError::Driver {
                call: "vkGetPhysicalDeviceSurfaceFormatsKHR",
                result: vk::Result::ERROR_FORMAT_NOT_SUPPORTED,
            },
        )?;
        let present_mode = surface::choose_present_mode(&support.present_modes);
        let extent = surface::choose_extent(&support.capabilities, window.framebuffer_size());
        let min_image_count = surface::choose_image_count(&support.capabilities);

        let (graphics, present) = device
            .queue_families
            .pair()
            .ok_or(BootstrapError::OutOfOrder("queue families"))?;
        let (sharing_mode, queue_family_indices) = if graphics == present {
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        } else {
            (vk::SharingMode::CONCURRENT, vec![graphics, present])
        };

        let desc = SwapchainDesc {
            surface,
            min_image_count,
            format,
            extent,
            image_usage: vk::ImageUsageFlags::STORAGE,
            sharing_mode,
            queue_family_indices,
            pre_transform: support.capabilities.current_transform,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            present_mode,
            clipped: true,
        };
        let handle = self.driver.create_swapchain(device.handle, &desc)?;
        self.swapchain = Some(Swapchain {
            handle,
            format,
            extent,
            present_mode,
            images: Vec::new(),
        });

        let images = self.driver.swapchain_images(device.handle, handle)?;
        trace!("swapchain has {} images", images.len());
        if let Some(swapchain) = &mut self.swapchain {
            swapchain.images = images;
        }
        self.advance(Stage::SwapchainReady);
        Ok(())
    }

    fn create_image_views(&mut self) -> Result<(), BootstrapError> {
        debug!("creating swapchain image views");
        let device = self.device.ok_or(BootstrapError::OutOfOrder("device"))?;
        let swapchain = self
            .swapchain
            .as_ref()
            .ok_or(BootstrapError::OutOfOrder("swapchain"))?;
        let format = swapchain.format.format;
        let images = swapchain.images.clone();

        for (i, image) in images.into_iter().enumerate() {
            let info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = self.driver.create_image_view(device.handle, &info)?;
            trace!("created swapchain image view #{i}");
            self.image_views.push(view);
        }
        self.advance(Stage::ImageViewsReady);
        Ok(())
    }

    fn selected(&self) -> Result<vk::PhysicalDevice, BootstrapError> {
        self.physical_device
            .as_ref()
            .map(|pd| pd.handle)
            .ok_or(BootstrapError::OutOfOrder("physical device"))
    }

    /// Releases everything in reverse creation order. Safe to call on a
    /// partially built engine and idempotent.
    fn teardown(&mut self) {
        if self.stage == Stage::Uninitialized && self.instance.is_none() {
            return;
        }
        debug!("destroying render engine");

        if let Some(device) = &self.device {
            if let Err(e) = self.driver.wait_idle(device.handle) {
                warn!("device wait idle failed during teardown: {e}");
            }
        }

        if let Some(device) = &self.device {
            for (i, view) in self.image_views.drain(..).enumerate().rev() {
                self.driver.destroy_image_view(device.handle, view);
                trace!("destroyed swapchain image view #{i}");
            }
        }
        if let (Some(device), Some(swapchain)) = (&self.device, self.swapchain.take()) {
            self.driver.destroy_swapchain(device.handle, swapchain.handle);
            trace!("destroyed swapchain");
        }
        if let Some(device) = self.device.take() {
            self.driver.destroy_device(device.handle);
            trace!("destroyed logical device");
        }
        self.physical_device = None;

        if let Some(instance) = self.instance {
            if let Some(surface) = self.surface.take() {
                self.driver.destroy_surface(instance, surface);
                trace!("destroyed surface");
            }
            if let Some(messenger) = self.debug_messenger.take() {
                self.driver.destroy_debug_messenger(instance, messenger);
                trace!("destroyed debug messenger");
            }
        }
        if let Some(instance) = self.instance.take() {
            self.driver.destroy_instance(instance);
            trace!("destroyed instance");
        }
        self.stage = Stage::Uninitialized;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    pub fn physical_device(&self) -> Option<&SelectedDevice> {
        self.physical_device.as_ref()
    }

    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }
}

impl<D: Driver> Drop for RenderEngine<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

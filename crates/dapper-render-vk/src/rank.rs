// SPDX-License-Identifier: CEPL-1.0
//! Physical device discovery and ranking.

use ash::vk;
use tracing::{debug, trace};

use crate::config::BootstrapConfig;
use crate::driver::{Driver, PhysicalDeviceInfo};
use crate::error::BootstrapError;
use crate::validate;

/// Added to the score of discrete GPUs.
pub const DISCRETE_GPU_BONUS: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Both indices once complete.
    pub fn pair(&self) -> Option<(u32, u32)> {
        Some((self.graphics?, self.present?))
    }

    /// Distinct families in ascending order.
    pub fn unique(&self) -> Vec<u32> {
        let mut families: Vec<u32> = self.graphics.into_iter().chain(self.present).collect();
        families.sort_unstable();
        families.dedup();
        families
    }
}

/// Surface capabilities as one physical device sees them. Never cached.
#[derive(Clone, Debug)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn query<D: Driver + ?Sized>(
        driver: &D,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self, BootstrapError> {
        let support = Self {
            capabilities: driver.surface_capabilities(physical_device, surface)?,
            formats: driver.surface_formats(physical_device, surface)?,
            present_modes: driver.surface_present_modes(physical_device, surface)?,
        };
        trace!(
            "swapchain support: {} format(s), {} present mode(s)",
            support.formats.len(),
            support.present_modes.len()
        );
        Ok(support)
    }

    /// Swapchain images are written from compute, so storage usage is
    /// mandatory alongside at least one format and present mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty()
            && !self.present_modes.is_empty()
            && self
                .capabilities
                .supported_usage_flags
                .contains(vk::ImageUsageFlags::STORAGE)
    }
}

/// Walks the families in order, keeping the latest match for each role, and
/// stops once both roles are filled.
pub fn find_queue_families<D: Driver + ?Sized>(
    driver: &D,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    requirement: vk::QueueFlags,
) -> Result<QueueFamilyIndices, BootstrapError> {
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in driver.queue_families(physical_device)?.iter().enumerate() {
        if family.queue_count == 0 {
            continue;
        }
        let i = i as u32;
        if family.queue_flags.contains(requirement) {
            indices.graphics = Some(i);
        }
        if driver.surface_support(physical_device, i, surface)? {
            indices.present = Some(i);
        }
        if indices.is_complete() {
            break;
        }
    }

    match indices.pair() {
        Some((graphics, present)) => {
            trace!("graphics family {graphics}, present family {present}")
        }
        None => trace!("no suitable graphics or present family"),
    }
    Ok(indices)
}

/// Raw score for a device that passed every check.
pub fn capability_score(device_type: vk::PhysicalDeviceType, max_image_dimension_2d: u32) -> u64 {
    let mut score = u64::from(max_image_dimension_2d);
    if device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        score += DISCRETE_GPU_BONUS;
    }
    score
}

/// Scores one device against the surface. `0` means disqualified; the checks
/// run cheapest first and stop at the first failure.
pub fn rank_physical_device<D: Driver + ?Sized>(
    driver: &D,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    config: &BootstrapConfig,
) -> Result<u64, BootstrapError> {
    let info = driver.physical_device_info(physical_device)?;
    trace!("found physical device: {}", info.name);

    let indices = find_queue_families(driver, physical_device, surface, config.queue_requirement)?;
    if !indices.is_complete() {
        trace!("{}: no suitable queue family", info.name);
        return Ok(0);
    }

    let available = driver.device_extensions(physical_device)?;
    for name in &available {
        trace!("found device extension: {name}");
    }
    let missing = validate::missing(&config.device_extensions, &available);
    if !missing.is_empty() {
        trace!("{}: missing device extensions {:?}", info.name, missing);
        return Ok(0);
    }

    let support = SwapchainSupport::query(driver, physical_device, surface)?;
    if !support.is_adequate() {
        trace!("{}: swapchain is not adequate", info.name);
        return Ok(0);
    }

    let score = capability_score(info.device_type, info.max_image_dimension_2d);
    trace!("{}: score {score}", info.name);
    Ok(score)
}

#[derive(Clone, Debug)]
pub struct SelectedDevice {
    pub handle: vk::PhysicalDevice,
    pub info: PhysicalDeviceInfo,
    pub score: u64,
}

/// Ranks every enumerated device and keeps the first one with the highest
/// score. Fails if nothing is enumerated or nothing scores above zero.
pub fn pick_physical_device<D: Driver + ?Sized>(
    driver: &D,
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    config: &BootstrapConfig,
) -> Result<SelectedDevice, BootstrapError> {
    let candidates = driver.physical_devices(instance)?;
    if candidates.is_empty() {
        return Err(BootstrapError::NoPhysicalDevice);
    }
    for name in &config.device_extensions {
        trace!("requested device extension: {name}");
    }

    let mut best: Option<(vk::PhysicalDevice, u64)> = None;
    for &candidate in &candidates {
        let score = rank_physical_device(driver, candidate, surface, config)?;
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((candidate, score));
        }
    }

    let (handle, score) = best.ok_or(BootstrapError::NoSuitableDevice {
        candidates: candidates.len(),
    })?;
    let info = driver.physical_device_info(handle)?;
    debug!(
        "selected physical device {} ({:?}, score {score})",
        info.name, info.device_type
    );
    Ok(SelectedDevice {
        handle,
        info,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_needs_both_roles() {
        let mut indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete());
        indices.graphics = Some(0);
        assert!(!indices.is_complete());
        indices.present = Some(0);
        assert!(indices.is_complete());
        assert_eq!(indices.pair(), Some((0, 0)));
    }

    #[test]
    fn unique_families_collapse_shared_index() {
        let shared = QueueFamilyIndices {
            graphics: Some(2),
            present: Some(2),
        };
        assert_eq!(shared.unique(), vec![2]);

        let split = QueueFamilyIndices {
            graphics: Some(3),
            present: Some(1),
        };
        assert_eq!(split.unique(), vec![1, 3]);
    }

    #[test]
    fn discrete_bonus_dominates_dimension() {
        let discrete = capability_score(vk::PhysicalDeviceType::DISCRETE_GPU, 8192);
        let integrated = capability_score(vk::PhysicalDeviceType::INTEGRATED_GPU, 8192);
        assert_eq!(discrete - integrated, DISCRETE_GPU_BONUS);
        assert_eq!(capability_score(vk::PhysicalDeviceType::CPU, 4096), 4096);
    }

    #[test]
    fn adequacy_requires_storage_usage() {
        let mut support = SwapchainSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(!support.is_adequate());

        support.capabilities.supported_usage_flags |= vk::ImageUsageFlags::STORAGE;
        assert!(support.is_adequate());

        support.present_modes.clear();
        assert!(!support.is_adequate());
    }
}

// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use dapper_render::RenderSize;

pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::R8G8B8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// RGBA8 / sRGB non-linear if offered anywhere, otherwise the first entry.
///
/// Returns `None` only for an empty list, which the ranker never lets through.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space
        })
        .or_else(|| formats.first().copied())
}

/// Mailbox, then FIFO relaxed, then FIFO (always available).
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO_RELAXED]
        .into_iter()
        .find(|wanted| modes.contains(wanted))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// The surface's current extent if it is defined, otherwise the framebuffer
/// size clamped per axis into the supported range.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: clamp_axis(
                framebuffer.width,
                caps.min_image_extent.width,
                caps.max_image_extent.width,
            ),
            height: clamp_axis(
                framebuffer.height,
                caps.min_image_extent.height,
                caps.max_image_extent.height,
            ),
        }
    }
}

/// A driver reporting `min > max` gets `min`.
fn clamp_axis(value: u32, min: u32, max: u32) -> u32 {
    value.clamp(min, max.max(min))
}

/// One more than the minimum, capped by the maximum (0 means no cap).
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count.saturating_add(1);
    if caps.max_image_count > 0 {
        wanted.min(caps.max_image_count)
    } else {
        wanted
    }
}

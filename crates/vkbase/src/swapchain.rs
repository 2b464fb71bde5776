//! Swapchain management.

use crate::error::{Result, VkBaseError};
use crate::surface::Surface;
use ash::vk;

/// Swapchain creation options.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainConfig {
    /// Present with FIFO when set; otherwise prefer MAILBOX, then IMMEDIATE.
    pub vsync: bool,
    /// Format used when the surface offers it.
    pub preferred_format: vk::SurfaceFormatKHR,
    /// Usage of the swapchain images.
    pub image_usage: vk::ImageUsageFlags,
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            vsync: true,
            preferred_format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        }
    }
}

impl SwapchainConfig {
    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set the preferred surface format.
    pub fn with_preferred_format(mut self, format: vk::SurfaceFormatKHR) -> Self {
        self.preferred_format = format;
        self
    }

    /// Set the image usage flags.
    pub fn with_image_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.image_usage = usage;
        self
    }
}

/// Swapchain wrapper. Destroys its image views and the swapchain on drop.
///
/// Must be dropped before the device and surface it was created for.
pub struct Swapchain {
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    loader: ash::khr::swapchain::Device,
    device: ash::Device,
}

impl Swapchain {
    /// Create a swapchain for `surface`.
    ///
    /// `old_swapchain` is retired by the driver but still has to be dropped
    /// by the caller.
    pub(crate) fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
        desired_extent: vk::Extent2D,
        config: &SwapchainConfig,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let caps = surface.capabilities(physical_device)?;

        let Some(format) = select_surface_format(&caps.formats, config.preferred_format) else {
            let message = "Surface reports no formats".to_string();
            return Err(VkBaseError::SwapchainCreation(message));
        };
        let present_mode = select_present_mode(&caps.present_modes, config.vsync);
        let extent = calculate_extent(
            &caps.capabilities,
            desired_extent.width,
            desired_extent.height,
        );
        let image_count = select_image_count(&caps.capabilities);
        let composite_alpha = select_composite_alpha(caps.capabilities.supported_composite_alpha);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(config.image_usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.capabilities.current_transform)
            .composite_alpha(composite_alpha)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or_default());

        let loader = ash::khr::swapchain::Device::new(instance, device);

        let handle = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(|e| VkBaseError::SwapchainCreation(e.to_string()))?;

        let mut swapchain = Self {
            handle,
            images: Vec::new(),
            image_views: Vec::new(),
            format,
            present_mode,
            extent,
            loader,
            device: device.clone(),
        };

        // From here on, drop cleans up whatever was created.
        swapchain.images = unsafe { swapchain.loader.get_swapchain_images(handle)? };
        for &image in &swapchain.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            let view = unsafe { device.create_image_view(&view_info, None)? };
            swapchain.image_views.push(view);
        }

        tracing::info!(
            "Created swapchain: {}x{}, {} images, {:?}, {:?}",
            extent.width,
            extent.height,
            swapchain.images.len(),
            format.format,
            present_mode,
        );

        Ok(swapchain)
    }

    /// Get the Vulkan swapchain handle.
    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Get the swapchain extension loader.
    pub const fn loader(&self) -> &ash::khr::swapchain::Device {
        &self.loader
    }

    /// Get the swapchain images.
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// Get one color view per image.
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get the surface format in use.
    pub const fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get the present mode in use.
    pub const fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Get the image extent.
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.handle, None);
        }
    }
}

/// Select the surface format: `preferred` if offered, otherwise the first one.
pub fn select_surface_format(
    available: &[vk::SurfaceFormatKHR],
    preferred: vk::SurfaceFormatKHR,
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| {
            format.format == preferred.format && format.color_space == preferred.color_space
        })
        .or_else(|| available.first())
        .copied()
}

/// Select the best present mode.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        // Prefer FIFO (vsync)
        vk::PresentModeKHR::FIFO
    } else {
        // Prefer mailbox (triple buffering without vsync)
        for &mode in available {
            if mode == vk::PresentModeKHR::MAILBOX {
                return mode;
            }
        }
        // Fall back to immediate
        for &mode in available {
            if mode == vk::PresentModeKHR::IMMEDIATE {
                return mode;
            }
        }
        // Fall back to FIFO (always supported)
        vk::PresentModeKHR::FIFO
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One image more than the minimum, capped by the maximum (0 means no cap).
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        image_count
    }
}

/// Opaque if supported, otherwise the first supported mode.
pub fn select_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ]
    .into_iter()
    .find(|&mode| supported.contains(mode))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn extent_2d(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    fn capabilities(current: u32, min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D {
                width: current,
                height: current,
            },
            min_image_extent: vk::Extent2D {
                width: 16,
                height: 16,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 2048,
            },
            ..Default::default()
        }
    }

    #[test]
    fn preferred_format_wins() {
        let preferred = SwapchainConfig::default().preferred_format;
        let srgb = vk::ColorSpaceKHR::SRGB_NONLINEAR;
        let other = format(vk::Format::R8G8B8A8_UNORM, srgb);
        let available = [other, preferred];

        let selected = select_surface_format(&available, preferred);
        assert_eq!(selected, Some(preferred));
    }

    #[test]
    fn first_format_is_fallback() {
        let preferred = SwapchainConfig::default().preferred_format;
        let srgb = vk::ColorSpaceKHR::SRGB_NONLINEAR;
        let first = format(vk::Format::R8G8B8A8_UNORM, srgb);
        // Right format, wrong color space
        let wide_gamut = format(
            vk::Format::B8G8R8A8_SRGB,
            vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT,
        );
        let available = [first, wide_gamut];

        let selected = select_surface_format(&available, preferred);
        assert_eq!(selected, Some(first));
    }

    #[test]
    fn no_formats() {
        let preferred = SwapchainConfig::default().preferred_format;
        assert_eq!(select_surface_format(&[], preferred), None);
    }

    #[test]
    fn vsync_uses_fifo() {
        let available = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        let mode = select_present_mode(&available, true);
        assert_eq!(mode, vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn present_mode_fallback_order() {
        let all = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        let mode = select_present_mode(&all, false);
        assert_eq!(mode, vk::PresentModeKHR::MAILBOX);

        let no_mailbox = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        let mode = select_present_mode(&no_mailbox, false);
        assert_eq!(mode, vk::PresentModeKHR::IMMEDIATE);

        let fifo_only = [vk::PresentModeKHR::FIFO];
        let mode = select_present_mode(&fifo_only, false);
        assert_eq!(mode, vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn fixed_surface_extent() {
        let caps = capabilities(800, 2, 3);
        let extent = calculate_extent(&caps, 640, 480);

        assert_eq!(extent, extent_2d(800, 800));
    }

    #[test]
    fn variable_surface_extent_is_clamped() {
        let caps = capabilities(u32::MAX, 2, 3);

        assert_eq!(calculate_extent(&caps, 640, 480), extent_2d(640, 480));
        assert_eq!(calculate_extent(&caps, 8, 9000), extent_2d(16, 2048));
    }

    #[test]
    fn image_count() {
        assert_eq!(select_image_count(&capabilities(0, 2, 8)), 3);
        assert_eq!(select_image_count(&capabilities(0, 3, 3)), 3);
        // No maximum
        assert_eq!(select_image_count(&capabilities(0, 1, 0)), 2);
    }

    #[test]
    fn composite_alpha() {
        assert_eq!(
            select_composite_alpha(
                vk::CompositeAlphaFlagsKHR::OPAQUE | vk::CompositeAlphaFlagsKHR::INHERIT
            ),
            vk::CompositeAlphaFlagsKHR::OPAQUE
        );
        assert_eq!(
            select_composite_alpha(vk::CompositeAlphaFlagsKHR::INHERIT),
            vk::CompositeAlphaFlagsKHR::INHERIT
        );
    }

    #[test]
    fn config_setters() {
        let config = SwapchainConfig::default()
            .with_vsync(false)
            .with_image_usage(
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            );

        assert!(!config.vsync);
        let usage = config.image_usage;
        assert!(usage.contains(vk::ImageUsageFlags::TRANSFER_DST));
    }
}

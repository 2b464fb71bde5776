//! Surface creation and queries.
//!
//! A surface is created by a caller-supplied function once the instance
//! exists. [`window_surface`] covers anything exposing raw window handles
//! (winit windows among others); [`headless_surface`] needs no window at all.

use crate::error::{Result, VkBaseError};
use crate::physical_device::PhysicalDeviceRef;
use crate::swapchain::select_present_mode;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;

/// Creates a `VkSurfaceKHR` for a freshly created instance.
pub trait SurfaceCreator: FnOnce(&ash::Entry, &ash::Instance) -> Result<vk::SurfaceKHR> {}

impl<F> SurfaceCreator for F where
    F: FnOnce(&ash::Entry, &ash::Instance) -> Result<vk::SurfaceKHR>
{
}

/// Surface creator for a window.
///
/// The window must outlive the surface.
pub fn window_surface<W>(window: &W) -> impl SurfaceCreator + '_
where
    W: HasDisplayHandle + HasWindowHandle,
{
    move |entry: &ash::Entry, instance: &ash::Instance| -> Result<vk::SurfaceKHR> {
        let display = window.display_handle().map_err(|e| {
            VkBaseError::SurfaceCreation(format!("Failed to get display handle: {e}"))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            VkBaseError::SurfaceCreation(format!("Failed to get window handle: {e}"))
        })?;

        unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| VkBaseError::SurfaceCreation(e.to_string()))
    }
}

/// Surface creator for `VK_EXT_headless_surface`.
///
/// The instance needs `VK_EXT_headless_surface` enabled.
pub fn headless_surface() -> impl SurfaceCreator {
    |entry: &ash::Entry, instance: &ash::Instance| -> Result<vk::SurfaceKHR> {
        let loader = ash::ext::headless_surface::Instance::new(entry, instance);
        let create_info = vk::HeadlessSurfaceCreateInfoEXT::default();

        unsafe { loader.create_headless_surface(&create_info, None) }
            .map_err(|e| VkBaseError::SurfaceCreation(e.to_string()))
    }
}

/// Instance extensions needed to create a surface for `display`.
pub fn required_surface_extensions(display: &impl HasDisplayHandle) -> Result<Vec<&'static CStr>> {
    let display = display.display_handle().map_err(|e| {
        VkBaseError::SurfaceCreation(format!("Failed to get display handle: {e}"))
    })?;

    let extensions = ash_window::enumerate_required_extensions(display.as_raw())?;

    // SAFETY: ash-window returns pointers to static, NUL-terminated names.
    Ok(extensions
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) })
        .collect())
}

/// An owned `VkSurfaceKHR`, destroyed on drop.
///
/// Must be dropped before the instance it was created from.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    pub(crate) fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        handle: vk::SurfaceKHR,
    ) -> Self {
        Self {
            handle,
            loader: ash::khr::surface::Instance::new(entry, instance),
        }
    }

    /// Get the Vulkan surface handle.
    pub const fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Get the surface extension loader.
    pub const fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }

    /// Whether queue family `family_index` of `physical_device` can present here.
    pub fn supports_family(
        &self,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
    ) -> Result<bool> {
        unsafe {
            Ok(self
                .loader
                .get_physical_device_surface_support(physical_device, family_index, self.handle)?)
        }
    }

    /// Whether any queue family of `device` can present to this surface.
    pub fn supported_by(&self, device: PhysicalDeviceRef<'_>) -> bool {
        let family_count = device.queue_family_properties().len();
        let handle = device.handle();

        (0_u32..)
            .take(family_count)
            .any(|family| self.supports_family(handle, family).unwrap_or(false))
    }

    /// Query surface capabilities.
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceCapabilities> {
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(physical_device, self.handle)?;

            let formats = self
                .loader
                .get_physical_device_surface_formats(physical_device, self.handle)?;

            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(physical_device, self.handle)?;

            Ok(SurfaceCapabilities {
                capabilities,
                formats,
                present_modes,
            })
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
    }
}

/// Surface capabilities query result.
#[derive(Debug, Clone)]
pub struct SurfaceCapabilities {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceCapabilities {
    /// Get the recommended present mode.
    pub fn recommended_present_mode(&self, vsync: bool) -> vk::PresentModeKHR {
        select_present_mode(&self.present_modes, vsync)
    }
}

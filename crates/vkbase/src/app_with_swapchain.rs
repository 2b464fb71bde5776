//! Bring-up with a surface and a swapchain.

use crate::app::{App, AppBuilder};
use crate::error::Result;
use crate::instance::ApplicationInfo;
use crate::physical_device::PhysicalDeviceRef;
use crate::queue::{DefaultQueueFamilyIndices, DefaultQueues};
use crate::surface::{Surface, SurfaceCreator};
use crate::swapchain::{Swapchain, SwapchainConfig};
use ash::vk;
use std::ops::Deref;

/// Builder for [`AppWithSwapchain`].
///
/// Adds `VK_KHR_surface` to the instance and `VK_KHR_swapchain` to the
/// device, and only selects devices that can present to the surface.
pub struct AppWithSwapchainBuilder<I = DefaultQueueFamilyIndices, Q = DefaultQueues> {
    app_builder: AppBuilder<I, Q>,
    swapchain_config: SwapchainConfig,
}

impl Default for AppWithSwapchainBuilder {
    fn default() -> Self {
        Self::new(AppBuilder::new())
    }
}

impl<I, Q> AppWithSwapchainBuilder<I, Q> {
    /// Wrap an [`AppBuilder`].
    pub fn new(app_builder: AppBuilder<I, Q>) -> Self {
        Self {
            app_builder,
            swapchain_config: SwapchainConfig::default(),
        }
    }

    /// Set the swapchain options.
    pub fn swapchain_config(mut self, config: SwapchainConfig) -> Self {
        self.swapchain_config = config;
        self
    }

    /// Create the instance, the surface, the device and the swapchain.
    ///
    /// `create_surface` runs right after instance creation; the instance
    /// already has the extensions the surface needs when they were added to
    /// the wrapped [`AppBuilder`].
    ///
    /// The selected device has at least one queue family that can present,
    /// but not necessarily one of the families the [`QueueSelection`] picked.
    /// Check with [`Surface::supports_family`] before presenting on a queue.
    ///
    /// [`QueueSelection`]: crate::queue::QueueSelection
    pub fn build(
        self,
        app_info: &ApplicationInfo,
        create_surface: impl SurfaceCreator,
        extent: vk::Extent2D,
    ) -> Result<AppWithSwapchain<I, Q>> {
        let instance = self
            .app_builder
            .create_instance(app_info, &[ash::khr::surface::NAME])?;

        let handle = create_surface(instance.entry(), instance.instance())?;
        let surface = Surface::new(instance.entry(), instance.instance(), handle);

        let device = self.app_builder.create_device(
            &instance,
            &[ash::khr::swapchain::NAME],
            &|device: PhysicalDeviceRef<'_>| surface.supported_by(device),
        )?;

        let swapchain = Swapchain::new(
            instance.instance(),
            device.device(),
            device.physical_device(),
            &surface,
            extent,
            &self.swapchain_config,
            None,
        )?;

        Ok(AppWithSwapchain {
            swapchain,
            surface,
            app: App::from_parts(instance, device),
            swapchain_config: self.swapchain_config,
        })
    }
}

/// An [`App`] with a surface and a swapchain.
///
/// Dereferences to the [`App`]. Destroys the swapchain, then the surface,
/// then the device and instance.
pub struct AppWithSwapchain<I = DefaultQueueFamilyIndices, Q = DefaultQueues> {
    swapchain: Swapchain,
    surface: Surface,
    app: App<I, Q>,
    swapchain_config: SwapchainConfig,
}

impl<I, Q> AppWithSwapchain<I, Q> {
    /// Get the underlying app.
    pub const fn app(&self) -> &App<I, Q> {
        &self.app
    }

    /// Get the surface.
    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Get the swapchain.
    pub const fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Get the swapchain options.
    pub const fn swapchain_config(&self) -> &SwapchainConfig {
        &self.swapchain_config
    }

    /// Recreate the swapchain (e.g., after resize).
    ///
    /// Waits for the device to be idle. The old swapchain is handed to the
    /// driver as `old_swapchain` and destroyed once the new one exists.
    pub fn recreate_swapchain(&mut self, extent: vk::Extent2D) -> Result<()> {
        self.app.wait_idle()?;

        let swapchain = Swapchain::new(
            self.app.instance(),
            self.app.device(),
            self.app.physical_device(),
            &self.surface,
            extent,
            &self.swapchain_config,
            Some(self.swapchain.handle()),
        )?;

        self.swapchain = swapchain;

        tracing::info!(
            "Swapchain recreated: {}x{}",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );

        Ok(())
    }
}

impl<I, Q> Deref for AppWithSwapchain<I, Q> {
    type Target = App<I, Q>;

    fn deref(&self) -> &Self::Target {
        &self.app
    }
}

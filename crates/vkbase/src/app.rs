//! Instance and device bring-up.

use crate::capabilities::DeviceCapabilities;
use crate::device::{
    device_extension_names, required_device_extensions, DeviceFeatures, LogicalDevice,
};
use crate::error::Result;
use crate::instance::{ApplicationInfo, InstanceContext, InstanceSettings};
use crate::names::{as_c_strs, push_unique};
use crate::physical_device::{
    default_physical_device_rater, rate_with_requirements, select_physical_device,
    PhysicalDeviceRater, PhysicalDeviceRef,
};
use crate::queue::{DefaultQueueFamilyIndices, DefaultQueues, QueueSelection};
use ash::vk;
use std::ffi::{CStr, CString};

/// Builder for [`App`].
///
/// `I` and `Q` are the queue family index and queue records produced by the
/// [`QueueSelection`]; the defaults resolve one graphics and one compute queue.
pub struct AppBuilder<I = DefaultQueueFamilyIndices, Q = DefaultQueues> {
    instance_extensions: Vec<CString>,
    device_extensions: Vec<CString>,
    validation: bool,
    portability: bool,
    rater: PhysicalDeviceRater,
    features: DeviceFeatures,
    queue_selection: QueueSelection<I, Q>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self {
            instance_extensions: Vec::new(),
            device_extensions: Vec::new(),
            validation: false,
            portability: false,
            rater: Box::new(default_physical_device_rater),
            features: DeviceFeatures::default(),
            queue_selection: QueueSelection::default(),
        }
    }
}

impl AppBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I, Q> AppBuilder<I, Q> {
    /// Enable an instance extension.
    pub fn instance_extension(mut self, name: &CStr) -> Self {
        push_unique(&mut self.instance_extensions, name);
        self
    }

    /// Enable several instance extensions.
    pub fn instance_extensions(mut self, names: &[&CStr]) -> Self {
        for name in names {
            push_unique(&mut self.instance_extensions, name);
        }
        self
    }

    /// Require a device extension. Devices without it are never selected.
    pub fn device_extension(mut self, name: &CStr) -> Self {
        push_unique(&mut self.device_extensions, name);
        self
    }

    /// Require several device extensions.
    pub fn device_extensions(mut self, names: &[&CStr]) -> Self {
        for name in names {
            push_unique(&mut self.device_extensions, name);
        }
        self
    }

    /// Enable the Khronos validation layer and route its messages to `tracing`.
    pub fn enable_validation_layers(self) -> Self {
        self.validation(true)
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.validation = enable;
        self
    }

    /// Enumerate portability implementations such as MoltenVK.
    pub fn enable_portability(self) -> Self {
        self.portability(true)
    }

    /// Enable or disable portability enumeration.
    pub fn portability(mut self, enable: bool) -> Self {
        self.portability = enable;
        self
    }

    /// Replace the physical device rater.
    pub fn physical_device_rater(
        mut self,
        rater: impl Fn(PhysicalDeviceRef<'_>) -> u32 + 'static,
    ) -> Self {
        self.rater = Box::new(rater);
        self
    }

    /// Set the features enabled on the logical device.
    pub fn device_features(mut self, features: DeviceFeatures) -> Self {
        self.features = features;
        self
    }

    /// Replace the queue selection, changing the index and queue record types.
    pub fn queue_selection<I2, Q2>(
        self,
        queue_selection: QueueSelection<I2, Q2>,
    ) -> AppBuilder<I2, Q2> {
        AppBuilder {
            instance_extensions: self.instance_extensions,
            device_extensions: self.device_extensions,
            validation: self.validation,
            portability: self.portability,
            rater: self.rater,
            features: self.features,
            queue_selection,
        }
    }

    /// Create the instance, pick a physical device and create the logical device.
    pub fn build(self, app_info: &ApplicationInfo) -> Result<App<I, Q>> {
        let instance = self.create_instance(app_info, &[])?;
        let device = self.create_device(&instance, &[], &|_: PhysicalDeviceRef<'_>| true)?;

        Ok(App::from_parts(instance, device))
    }

    pub(crate) fn create_instance(
        &self,
        app_info: &ApplicationInfo,
        extra_extensions: &[&CStr],
    ) -> Result<InstanceContext> {
        let settings = InstanceSettings {
            extensions: self.instance_extensions.clone(),
            validation: self.validation,
            portability: self.portability,
        };

        InstanceContext::new(app_info, &settings, extra_extensions)
    }

    /// Select a physical device accepted by `accept` and create the logical device.
    pub(crate) fn create_device(
        &self,
        instance: &InstanceContext,
        extra_extensions: &[&CStr],
        accept: &dyn Fn(PhysicalDeviceRef<'_>) -> bool,
    ) -> Result<LogicalDevice<I, Q>> {
        let required = required_device_extensions(&self.device_extensions, extra_extensions);
        let required = as_c_strs(&required);

        let rate = |device: PhysicalDeviceRef<'_>| -> u32 {
            match device.extension_names() {
                Ok(available) => rate_with_requirements(
                    &available,
                    &required,
                    || accept(device),
                    || (self.rater)(device),
                ),
                Err(e) => {
                    tracing::warn!("Failed to enumerate device extensions: {e}");
                    0
                }
            }
        };

        let physical_device = select_physical_device(instance.instance(), &rate)?;
        let physical_device = PhysicalDeviceRef::new(instance.instance(), physical_device);

        let capabilities = DeviceCapabilities::query(physical_device);
        tracing::info!("Selected GPU: {}", capabilities.summary());

        let available = physical_device.extension_names()?;
        let extensions = device_extension_names(&required, self.portability, &available);

        LogicalDevice::new(
            physical_device,
            &self.queue_selection,
            &extensions,
            &self.features,
        )
    }
}

/// A Vulkan instance with a logical device and its queues.
///
/// The device is destroyed before the instance.
pub struct App<I = DefaultQueueFamilyIndices, Q = DefaultQueues> {
    device: LogicalDevice<I, Q>,
    instance: InstanceContext,
}

impl<I, Q> App<I, Q> {
    pub(crate) fn from_parts(instance: InstanceContext, device: LogicalDevice<I, Q>) -> Self {
        Self { device, instance }
    }

    /// Get the Vulkan entry point.
    pub fn entry(&self) -> &ash::Entry {
        self.instance.entry()
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        self.instance.instance()
    }

    /// Get the physical device handle.
    pub const fn physical_device(&self) -> vk::PhysicalDevice {
        self.device.physical_device()
    }

    /// Get the physical device together with its instance.
    pub fn physical_device_ref(&self) -> PhysicalDeviceRef<'_> {
        PhysicalDeviceRef::new(self.instance(), self.physical_device())
    }

    /// Get the Vulkan device handle.
    pub const fn device(&self) -> &ash::Device {
        self.device.device()
    }

    /// Get the resolved queue family indices.
    pub const fn queue_family_indices(&self) -> &I {
        self.device.queue_family_indices()
    }

    /// Get the fetched queues.
    pub const fn queues(&self) -> &Q {
        self.device.queues()
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}

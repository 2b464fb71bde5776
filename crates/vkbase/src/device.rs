//! Logical device creation.

use crate::error::Result;
use crate::names::{as_ptrs, push_unique};
use crate::physical_device::PhysicalDeviceRef;
use crate::queue::QueueSelection;
use ash::vk;
use std::collections::HashSet;
use std::ffi::{CStr, CString};

/// Name of `VK_KHR_portability_subset`.
pub const PORTABILITY_SUBSET_EXTENSION: &CStr = c"VK_KHR_portability_subset";

/// Features enabled at device creation.
///
/// The optional structs are chained onto `VkDeviceCreateInfo`. Their own
/// `p_next` must be null.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceFeatures {
    pub features: vk::PhysicalDeviceFeatures,
    pub vulkan_11: Option<vk::PhysicalDeviceVulkan11Features<'static>>,
    pub vulkan_12: Option<vk::PhysicalDeviceVulkan12Features<'static>>,
    pub vulkan_13: Option<vk::PhysicalDeviceVulkan13Features<'static>>,
    /// `VK_KHR_dynamic_rendering` on devices below Vulkan 1.3.
    pub dynamic_rendering: Option<vk::PhysicalDeviceDynamicRenderingFeaturesKHR<'static>>,
}

impl DeviceFeatures {
    /// Set the core features.
    pub fn with_features(mut self, features: vk::PhysicalDeviceFeatures) -> Self {
        self.features = features;
        self
    }

    /// Chain Vulkan 1.1 features.
    pub fn with_vulkan_11(mut self, features: vk::PhysicalDeviceVulkan11Features<'static>) -> Self {
        self.vulkan_11 = Some(features);
        self
    }

    /// Chain Vulkan 1.2 features.
    pub fn with_vulkan_12(mut self, features: vk::PhysicalDeviceVulkan12Features<'static>) -> Self {
        self.vulkan_12 = Some(features);
        self
    }

    /// Chain Vulkan 1.3 features.
    pub fn with_vulkan_13(mut self, features: vk::PhysicalDeviceVulkan13Features<'static>) -> Self {
        self.vulkan_13 = Some(features);
        self
    }

    /// Chain `VK_KHR_dynamic_rendering` features.
    pub fn with_dynamic_rendering(
        mut self,
        features: vk::PhysicalDeviceDynamicRenderingFeaturesKHR<'static>,
    ) -> Self {
        self.dynamic_rendering = Some(features);
        self
    }
}

/// User extensions followed by `extra` (such as `VK_KHR_swapchain`), without duplicates.
pub(crate) fn required_device_extensions(user: &[CString], extra: &[&CStr]) -> Vec<CString> {
    let mut names = user.to_vec();
    for name in extra {
        push_unique(&mut names, name);
    }
    names
}

/// Required device extensions, plus `VK_KHR_portability_subset` when the
/// device advertises it and portability is enabled.
pub(crate) fn device_extension_names(
    required: &[&CStr],
    portability: bool,
    available: &HashSet<String>,
) -> Vec<CString> {
    let mut names = Vec::new();
    for name in required {
        push_unique(&mut names, name);
    }

    let subset = PORTABILITY_SUBSET_EXTENSION.to_string_lossy();
    if portability && available.contains(&*subset) {
        push_unique(&mut names, PORTABILITY_SUBSET_EXTENSION);
    }

    names
}

/// One queue of priority 1.0 per family.
fn queue_create_infos<'a>(
    families: &[u32],
    priority: &'a f32,
) -> Vec<vk::DeviceQueueCreateInfo<'a>> {
    families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(priority))
        })
        .collect()
}

/// Logical device with its resolved queue families and queues.
pub struct LogicalDevice<I, Q> {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue_family_indices: I,
    queues: Q,
}

impl<I, Q> LogicalDevice<I, Q> {
    /// Resolve queue families, create the device and fetch its queues.
    pub(crate) fn new(
        physical_device: PhysicalDeviceRef<'_>,
        selection: &QueueSelection<I, Q>,
        extensions: &[CString],
        features: &DeviceFeatures,
    ) -> Result<Self> {
        let queue_family_indices = selection.family_indices(physical_device)?;
        let unique_families = selection.unique_indices(&queue_family_indices);
        tracing::debug!("Requesting queues from families {unique_families:?}");

        let queue_priority = 1.0_f32;
        let queue_create_infos = queue_create_infos(&unique_families, &queue_priority);

        tracing::debug!("Device extensions: {extensions:?}");
        let extension_names = as_ptrs(extensions);

        let mut features = *features;
        let mut create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features.features);

        if let Some(vulkan_11) = features.vulkan_11.as_mut() {
            create_info = create_info.push_next(vulkan_11);
        }
        if let Some(vulkan_12) = features.vulkan_12.as_mut() {
            create_info = create_info.push_next(vulkan_12);
        }
        if let Some(vulkan_13) = features.vulkan_13.as_mut() {
            create_info = create_info.push_next(vulkan_13);
        }
        if let Some(dynamic_rendering) = features.dynamic_rendering.as_mut() {
            create_info = create_info.push_next(dynamic_rendering);
        }

        let device = unsafe {
            physical_device
                .instance()
                .create_device(physical_device.handle(), &create_info, None)?
        };

        let queues = selection.queues(&queue_family_indices, &device);

        Ok(Self {
            device,
            physical_device: physical_device.handle(),
            queue_family_indices,
            queues,
        })
    }

    /// Get the Vulkan device handle.
    pub const fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub const fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the resolved queue family indices.
    pub const fn queue_family_indices(&self) -> &I {
        &self.queue_family_indices
    }

    /// Get the fetched queues.
    pub const fn queues(&self) -> &Q {
        &self.queues
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl<I, Q> Drop for LogicalDevice<I, Q> {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_queue_per_family() {
        let priority = 1.0_f32;
        let infos = queue_create_infos(&[0, 2], &priority);

        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].queue_family_index, 0);
        assert_eq!(infos[1].queue_family_index, 2);
        for info in &infos {
            assert_eq!(info.queue_count, 1);
            assert_eq!(unsafe { *info.p_queue_priorities }, 1.0);
        }
    }

    #[test]
    fn feature_setters_chain() {
        let core = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);
        let vulkan_13 = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);
        let features = DeviceFeatures::default()
            .with_features(core)
            .with_vulkan_13(vulkan_13);

        assert_eq!(features.features.sampler_anisotropy, vk::TRUE);
        let dynamic_rendering = features.vulkan_13.map(|f| f.dynamic_rendering);
        assert_eq!(dynamic_rendering, Some(vk::TRUE));
        assert!(features.vulkan_12.is_none());
        assert!(features.dynamic_rendering.is_none());
    }

    fn advertised(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn portability_subset_needs_switch_and_support() {
        let required = [c"VK_KHR_swapchain"];
        let with_subset = advertised(&["VK_KHR_swapchain", "VK_KHR_portability_subset"]);
        let without_subset = advertised(&["VK_KHR_swapchain"]);
        let swapchain_only = vec![c"VK_KHR_swapchain".to_owned()];

        assert_eq!(
            device_extension_names(&required, true, &with_subset),
            vec![
                c"VK_KHR_swapchain".to_owned(),
                PORTABILITY_SUBSET_EXTENSION.to_owned()
            ]
        );

        for (portability, available) in [
            (true, &without_subset),
            (false, &with_subset),
            (false, &without_subset),
        ] {
            let names = device_extension_names(&required, portability, available);
            assert_eq!(names, swapchain_only);
        }
    }

    #[test]
    fn swapchain_extension_appended_once() {
        let user = [c"VK_KHR_dynamic_rendering".to_owned()];

        assert_eq!(
            required_device_extensions(&user, &[c"VK_KHR_swapchain"]),
            vec![
                c"VK_KHR_dynamic_rendering".to_owned(),
                c"VK_KHR_swapchain".to_owned()
            ]
        );

        let user = [c"VK_KHR_swapchain".to_owned()];
        assert_eq!(
            required_device_extensions(&user, &[c"VK_KHR_swapchain"]),
            vec![c"VK_KHR_swapchain".to_owned()]
        );
        assert!(required_device_extensions(&[], &[]).is_empty());
    }
}

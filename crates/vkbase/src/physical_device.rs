//! Physical device queries and selection.

use crate::capabilities::DeviceCapabilities;
use crate::error::{Result, VkBaseError};
use crate::names::missing_names;
use ash::vk;
use std::collections::HashSet;
use std::ffi::CStr;

/// A physical device together with the instance it was enumerated from.
///
/// Handed to raters and queue family getters. Only the crate creates these,
/// from handles returned by `vkEnumeratePhysicalDevices`.
#[derive(Clone, Copy)]
pub struct PhysicalDeviceRef<'a> {
    instance: &'a ash::Instance,
    handle: vk::PhysicalDevice,
}

impl<'a> PhysicalDeviceRef<'a> {
    pub(crate) const fn new(instance: &'a ash::Instance, handle: vk::PhysicalDevice) -> Self {
        Self { instance, handle }
    }

    /// Get the raw physical device handle.
    pub const fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    /// Get the instance the device belongs to.
    pub const fn instance(&self) -> &'a ash::Instance {
        self.instance
    }

    /// Query device properties.
    pub fn properties(&self) -> vk::PhysicalDeviceProperties {
        unsafe { self.instance.get_physical_device_properties(self.handle) }
    }

    /// Query core device features.
    pub fn features(&self) -> vk::PhysicalDeviceFeatures {
        unsafe { self.instance.get_physical_device_features(self.handle) }
    }

    /// Query memory heaps and types.
    pub fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        unsafe { self.instance.get_physical_device_memory_properties(self.handle) }
    }

    /// Query the queue family property list.
    pub fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        unsafe { self.instance.get_physical_device_queue_family_properties(self.handle) }
    }

    /// Names of all device extensions the driver advertises.
    pub fn extension_names(&self) -> Result<HashSet<String>> {
        let extensions =
            unsafe { self.instance.enumerate_device_extension_properties(self.handle)? };

        Ok(extensions
            .iter()
            .filter_map(|ext| {
                unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                    .to_str()
                    .ok()
                    .map(String::from)
            })
            .collect())
    }

    /// Check whether the device advertises every extension in `names`.
    pub fn supports_extensions(&self, names: &[&CStr]) -> bool {
        match self.extension_names() {
            Ok(available) => missing_names(&available, names).is_empty(),
            Err(e) => {
                tracing::warn!("Failed to enumerate device extensions: {e}");
                false
            }
        }
    }
}

/// Rates a physical device. Zero rejects the device.
pub type PhysicalDeviceRater = Box<dyn Fn(PhysicalDeviceRef<'_>) -> u32>;

/// Default rating: prefer discrete GPUs, then more device-local memory.
pub fn default_physical_device_rater(device: PhysicalDeviceRef<'_>) -> u32 {
    let capabilities = DeviceCapabilities::query(device);

    let type_score: u32 = match capabilities.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 50,
        _ => 1,
    };

    // +1 per GB
    let memory_score =
        u32::try_from(capabilities.device_local_memory_mb / 1024).unwrap_or(u32::MAX);

    type_score.saturating_add(memory_score)
}

/// Rating of a device that advertises every `required` extension and passes
/// `accept`, 0 otherwise. `rate` only runs for devices that qualify.
pub(crate) fn rate_with_requirements(
    available: &HashSet<String>,
    required: &[&CStr],
    accept: impl FnOnce() -> bool,
    rate: impl FnOnce() -> u32,
) -> u32 {
    let missing = missing_names(available, required);
    if !missing.is_empty() {
        let missing = missing.join(", ");
        tracing::debug!("Rejecting device, missing extensions: {missing}");
        return 0;
    }

    if !accept() {
        return 0;
    }

    rate()
}

/// Rate every physical device of `instance` and return the best one.
pub(crate) fn select_physical_device(
    instance: &ash::Instance,
    rate: &dyn Fn(PhysicalDeviceRef<'_>) -> u32,
) -> Result<vk::PhysicalDevice> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        return Err(VkBaseError::NoSuitableDevice);
    }

    let rated = devices.into_iter().map(|handle| {
        let device = PhysicalDeviceRef::new(instance, handle);
        let rating = rate(device);
        tracing::debug!(
            "Physical device candidate: {} (rating {rating})",
            DeviceCapabilities::query(device).device_name
        );
        (handle, rating)
    });

    best_rated(rated).ok_or(VkBaseError::NoSuitableDevice)
}

/// Highest non-zero rating wins; the earlier candidate wins a tie.
pub(crate) fn best_rated<T>(candidates: impl IntoIterator<Item = (T, u32)>) -> Option<T> {
    let mut best = None;
    let mut best_rating = 0;

    for (candidate, rating) in candidates {
        if rating > best_rating {
            best_rating = rating;
            best = Some(candidate);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn highest_rating_wins() {
        let best = best_rated([("integrated", 100), ("discrete", 1000), ("cpu", 1)]);
        assert_eq!(best, Some("discrete"));
    }

    #[test]
    fn zero_rating_is_rejected() {
        assert_eq!(best_rated([("a", 0), ("b", 0)]), None::<&str>);
        assert_eq!(best_rated([("a", 0), ("b", 3)]), Some("b"));
    }

    #[test]
    fn tie_keeps_first_candidate() {
        assert_eq!(best_rated([("first", 7), ("second", 7)]), Some("first"));
    }

    #[test]
    fn no_candidates() {
        assert_eq!(best_rated(Vec::<(u8, u32)>::new()), None);
    }

    fn advertised(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn missing_device_extension_rates_zero() {
        let available = advertised(&["VK_KHR_maintenance2"]);
        let rater_called = Cell::new(false);

        let rating = rate_with_requirements(
            &available,
            &[c"VK_KHR_swapchain"],
            || true,
            || {
                rater_called.set(true);
                1000
            },
        );

        assert_eq!(rating, 0);
        assert!(!rater_called.get());
    }

    #[test]
    fn rejected_device_rates_zero() {
        let available = advertised(&["VK_KHR_swapchain"]);

        let rating = rate_with_requirements(&available, &[c"VK_KHR_swapchain"], || false, || 1000);

        assert_eq!(rating, 0);
    }

    #[test]
    fn qualifying_device_keeps_rating() {
        let available = advertised(&["VK_KHR_swapchain", "VK_KHR_dynamic_rendering"]);

        let rating = rate_with_requirements(&available, &[c"VK_KHR_swapchain"], || true, || 1004);

        assert_eq!(rating, 1004);
        assert_eq!(rate_with_requirements(&available, &[], || true, || 7), 7);
    }

    #[test]
    fn rejected_device_never_selected() {
        let available = advertised(&["VK_KHR_swapchain"]);
        let required = [c"VK_KHR_swapchain", c"VK_KHR_dynamic_rendering"];

        let ratings = [("discrete", 1000), ("integrated", 100)].map(|(name, score)| {
            let rating = if name == "discrete" {
                rate_with_requirements(&available, &required, || true, || score)
            } else {
                rate_with_requirements(&available, &required[..1], || true, || score)
            };
            (name, rating)
        });

        assert_eq!(best_rated(ratings), Some("integrated"));
    }
}

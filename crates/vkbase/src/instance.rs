//! Vulkan instance creation.

use crate::debug::{messenger_create_info, DebugMessenger};
use crate::error::{Result, VkBaseError};
use crate::names::{as_c_strs, as_ptrs, missing_names, push_unique};
use ash::vk;
use std::collections::HashSet;
use std::ffi::{CStr, CString};

/// Khronos validation layer.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Application description passed to `vkCreateInstance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    /// Highest Vulkan version the application uses.
    pub api_version: u32,
}

impl Default for ApplicationInfo {
    fn default() -> Self {
        Self {
            application_name: "vkbase".to_string(),
            application_version: 0,
            engine_name: "vkbase".to_string(),
            engine_version: 0,
            api_version: vk::API_VERSION_1_2,
        }
    }
}

impl ApplicationInfo {
    /// Create application info with the given name.
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            ..Default::default()
        }
    }

    /// Set the application version.
    pub fn with_application_version(mut self, version: u32) -> Self {
        self.application_version = version;
        self
    }

    /// Set the engine name and version.
    pub fn with_engine(mut self, name: impl Into<String>, version: u32) -> Self {
        self.engine_name = name.into();
        self.engine_version = version;
        self
    }

    /// Set the Vulkan API version.
    pub fn with_api_version(mut self, api_version: u32) -> Self {
        self.api_version = api_version;
        self
    }
}

/// Instance-level switches collected by the builders.
#[derive(Debug, Clone, Default)]
pub(crate) struct InstanceSettings {
    pub extensions: Vec<CString>,
    pub validation: bool,
    pub portability: bool,
}

impl InstanceSettings {
    /// User extensions, then `extra`, then those implied by the switches.
    pub fn extension_names(&self, api_version: u32, extra: &[&CStr]) -> Vec<CString> {
        let mut names = Vec::new();

        for name in self.extensions.iter().map(CString::as_c_str).chain(extra.iter().copied()) {
            push_unique(&mut names, name);
        }

        if self.validation {
            push_unique(&mut names, ash::ext::debug_utils::NAME);
        }

        if self.portability {
            push_unique(&mut names, ash::khr::portability_enumeration::NAME);
            // Promoted to core in 1.1; MoltenVK needs it for portability_subset.
            if api_version < vk::API_VERSION_1_1 {
                push_unique(&mut names, ash::khr::get_physical_device_properties2::NAME);
            }
        }

        names
    }

    pub fn layer_names(&self) -> Vec<CString> {
        if self.validation {
            vec![VALIDATION_LAYER.to_owned()]
        } else {
            vec![]
        }
    }

    pub fn create_flags(&self) -> vk::InstanceCreateFlags {
        if self.portability {
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        }
    }
}

/// Loaded Vulkan entry, instance and (with validation) debug messenger.
pub struct InstanceContext {
    debug_messenger: Option<DebugMessenger>,
    instance: ash::Instance,
    // Keeps the loader library alive
    entry: ash::Entry,
}

impl InstanceContext {
    /// Load Vulkan and create an instance.
    pub(crate) fn new(
        app_info: &ApplicationInfo,
        settings: &InstanceSettings,
        extra_extensions: &[&CStr],
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let layers = settings.layer_names();
        unsafe { check_layers(&entry, &layers)? };

        let extensions = settings.extension_names(app_info.api_version, extra_extensions);
        unsafe { check_extensions(&entry, &extensions, &layers)? };

        tracing::debug!("Instance layers: {layers:?}");
        tracing::debug!("Instance extensions: {extensions:?}");

        let application_name = CString::new(app_info.application_name.as_str())?;
        let engine_name = CString::new(app_info.engine_name.as_str())?;

        let vk_app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(app_info.application_version)
            .engine_name(&engine_name)
            .engine_version(app_info.engine_version)
            .api_version(app_info.api_version);

        let layer_names = as_ptrs(&layers);
        let extension_names = as_ptrs(&extensions);
        let mut debug_info = messenger_create_info();

        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&vk_app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names)
            .flags(settings.create_flags());

        if settings.validation {
            create_info = create_info.push_next(&mut debug_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        let debug_messenger = if settings.validation {
            match unsafe { DebugMessenger::new(&entry, &instance) } {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        tracing::info!(
            "Created Vulkan {}.{} instance for {} (validation: {}, portability: {})",
            vk::api_version_major(app_info.api_version),
            vk::api_version_minor(app_info.api_version),
            app_info.application_name,
            settings.validation,
            settings.portability,
        );

        Ok(Self {
            debug_messenger,
            instance,
            entry,
        })
    }

    /// Get the Vulkan entry point.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        unsafe {
            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// # Safety
/// The entry must be a valid Vulkan entry point.
unsafe fn check_layers(entry: &ash::Entry, layers: &[CString]) -> Result<()> {
    if layers.is_empty() {
        return Ok(());
    }

    let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };
    let available: HashSet<String> = available_layers
        .iter()
        .map(|props| {
            unsafe { CStr::from_ptr(props.layer_name.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    let missing = missing_names(&available, &as_c_strs(layers));
    if !missing.is_empty() {
        let missing = missing.join(", ");
        tracing::warn!("Layer {missing} not available, is the Vulkan SDK installed?");
        return Err(VkBaseError::LayerNotPresent(missing));
    }

    Ok(())
}

/// Extensions may come from the loader/ICDs or from an enabled layer.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
unsafe fn check_extensions(
    entry: &ash::Entry,
    extensions: &[CString],
    layers: &[CString],
) -> Result<()> {
    let mut properties = unsafe { entry.enumerate_instance_extension_properties(None)? };
    for layer in layers {
        properties.extend(unsafe {
            entry.enumerate_instance_extension_properties(Some(layer.as_c_str()))?
        });
    }

    let available: HashSet<String> = properties
        .iter()
        .map(|props| {
            unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    let missing = missing_names(&available, &as_c_strs(extensions));
    if !missing.is_empty() {
        return Err(VkBaseError::ExtensionNotSupported(missing.join(", ")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(validation: bool, portability: bool) -> InstanceSettings {
        InstanceSettings {
            extensions: vec![c"VK_KHR_surface".to_owned()],
            validation,
            portability,
        }
    }

    #[test]
    fn plain_instance() {
        let settings = settings(false, false);

        assert_eq!(
            settings.extension_names(vk::API_VERSION_1_2, &[]),
            vec![c"VK_KHR_surface".to_owned()]
        );
        assert!(settings.layer_names().is_empty());
        assert_eq!(settings.create_flags(), vk::InstanceCreateFlags::empty());
    }

    #[test]
    fn validation_adds_layer_and_debug_utils() {
        let settings = settings(true, false);

        assert_eq!(
            settings.extension_names(vk::API_VERSION_1_2, &[]),
            vec![c"VK_KHR_surface".to_owned(), c"VK_EXT_debug_utils".to_owned()]
        );
        assert_eq!(settings.layer_names(), vec![VALIDATION_LAYER.to_owned()]);
    }

    #[test]
    fn portability_sets_flag_and_extension() {
        let settings = settings(false, true);

        assert_eq!(
            settings.extension_names(vk::API_VERSION_1_2, &[]),
            vec![
                c"VK_KHR_surface".to_owned(),
                c"VK_KHR_portability_enumeration".to_owned()
            ]
        );
        assert_eq!(
            settings.create_flags(),
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        );
    }

    #[test]
    fn portability_on_vulkan_1_0_needs_properties2() {
        let names = settings(false, true).extension_names(vk::API_VERSION_1_0, &[]);

        let properties2 = c"VK_KHR_get_physical_device_properties2".to_owned();
        assert!(names.contains(&properties2));
    }

    #[test]
    fn extra_extensions_are_deduplicated() {
        let extra = [c"VK_KHR_surface", c"VK_EXT_headless_surface"];
        let names = settings(false, false).extension_names(vk::API_VERSION_1_2, &extra);

        assert_eq!(
            names,
            vec![
                c"VK_KHR_surface".to_owned(),
                c"VK_EXT_headless_surface".to_owned()
            ]
        );
    }

    #[test]
    fn application_info_setters() {
        let info = ApplicationInfo::new("vkbase Test")
            .with_application_version(3)
            .with_engine("engine", 7)
            .with_api_version(vk::API_VERSION_1_3);

        assert_eq!(info.application_name, "vkbase Test");
        assert_eq!(info.application_version, 3);
        assert_eq!(info.engine_name, "engine");
        assert_eq!(info.engine_version, 7);
        assert_eq!(info.api_version, vk::API_VERSION_1_3);
    }
}

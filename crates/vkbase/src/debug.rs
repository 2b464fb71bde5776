//! Validation layer message forwarding.

use crate::error::Result;
use ash::vk;
use std::ffi::{c_void, CStr};

/// Messenger create info that routes validation output to [`tracing`].
///
/// Also chained into instance creation so messages from
/// `vkCreateInstance`/`vkDestroyInstance` are not lost.
pub(crate) fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
}

/// A `VK_EXT_debug_utils` messenger.
///
/// Destroyed explicitly by the owning instance, before the instance itself.
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// # Safety
    /// The instance must be valid and created with `VK_EXT_debug_utils` enabled.
    pub(crate) unsafe fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let messenger =
            unsafe { loader.create_debug_utils_messenger(&messenger_create_info(), None)? };

        Ok(Self { loader, messenger })
    }

    /// # Safety
    /// Must be called once, before the instance is destroyed.
    pub(crate) unsafe fn destroy(&self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || unsafe { (*p_callback_data).p_message.is_null() } {
        return vk::FALSE;
    }

    let message = unsafe { CStr::from_ptr((*p_callback_data).p_message) }.to_string_lossy();

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            tracing::error!("[Vulkan {message_type:?}] {message}");
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            tracing::warn!("[Vulkan {message_type:?}] {message}");
        }
        // INFO is mostly loader chatter
        _ => {
            tracing::debug!("[Vulkan {message_type:?}] {message}");
        }
    }

    vk::FALSE
}

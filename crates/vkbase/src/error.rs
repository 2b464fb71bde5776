//! Error types.

use ash::vk;
use thiserror::Error;

/// Errors raised while building a Vulkan application.
#[derive(Error, Debug)]
pub enum VkBaseError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found or loaded.
    #[error("Failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// A name passed to Vulkan contained an interior NUL byte.
    #[error("Invalid name: {0}")]
    InvalidName(#[from] std::ffi::NulError),

    /// The queue family scan ended without finding every required capability.
    #[error("Failed to get required queue family indices from physical device (missing {0:?})")]
    MissingQueueCapability(vk::QueueFlags),

    /// No physical device received a non-zero rating.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Requested instance layer is not installed.
    #[error("Instance layer not present: {0}")]
    LayerNotPresent(String),

    /// Required extension not supported.
    #[error("Required extension not supported: {0}")]
    ExtensionNotSupported(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, VkBaseError>;

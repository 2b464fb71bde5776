//! Vulkan bring-up helpers built on `ash`.
//!
//! This crate provides:
//! - Instance creation with optional validation layers and portability
//! - Physical device selection through a pluggable rater
//! - Queue family resolution and queue fetching through a pluggable [`QueueSelection`]
//! - Logical device creation with feature chains
//! - Window and headless surfaces, and swapchain handling
//!
//! ```no_run
//! use vkbase::{AppBuilder, ApplicationInfo};
//!
//! # fn main() -> vkbase::Result<()> {
//! let app = AppBuilder::new()
//!     .enable_validation_layers()
//!     .build(&ApplicationInfo::new("example"))?;
//!
//! let queues = app.queues();
//! # let _ = queues.graphics;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod app_with_swapchain;
pub mod capabilities;
mod debug;
pub mod device;
pub mod error;
pub mod instance;
mod names;
pub mod physical_device;
pub mod queue;
pub mod surface;
pub mod swapchain;

pub use app::{App, AppBuilder};
pub use app_with_swapchain::{AppWithSwapchain, AppWithSwapchainBuilder};
pub use capabilities::{DeviceCapabilities, GpuVendor};
pub use device::{DeviceFeatures, LogicalDevice, PORTABILITY_SUBSET_EXTENSION};
pub use error::{Result, VkBaseError};
pub use instance::{ApplicationInfo, InstanceContext, VALIDATION_LAYER};
pub use physical_device::{default_physical_device_rater, PhysicalDeviceRater, PhysicalDeviceRef};
pub use queue::{DefaultQueueFamilyIndices, DefaultQueues, QueueSelection, QueueSource};
pub use surface::{
    headless_surface, required_surface_extensions, window_surface, Surface, SurfaceCapabilities,
    SurfaceCreator,
};
pub use swapchain::{Swapchain, SwapchainConfig};

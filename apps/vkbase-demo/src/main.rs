//! vkbase bring-up demos.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p vkbase-demo -- [MODE]
//! ```
//!
//! ## Modes
//!
//! - `default`: instance and device with graphics and compute queues (default)
//! - `headless`: Vulkan 1.0 instance with a headless swapchain
//! - `custom-queue`: device with a single transfer queue
//! - `dynamic-rendering`: `VK_KHR_dynamic_rendering` device with a headless swapchain
//! - `window`: winit window with a swapchain that follows resizes
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod window;

use ash::vk;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vkbase::{
    default_physical_device_rater, headless_surface, AppBuilder, AppWithSwapchain,
    AppWithSwapchainBuilder, ApplicationInfo, DeviceFeatures, PhysicalDeviceRef, QueueSelection,
    QueueSource, VkBaseError,
};

const HEADLESS_EXTENT: vk::Extent2D = vk::Extent2D {
    width: 640,
    height: 480,
};

/// Device extensions `VK_KHR_dynamic_rendering` depends on, itself last.
const DYNAMIC_RENDERING_EXTENSIONS: [&std::ffi::CStr; 5] = [
    ash::khr::multiview::NAME,
    ash::khr::maintenance2::NAME,
    ash::khr::create_renderpass2::NAME,
    ash::khr::depth_stencil_resolve::NAME,
    ash::khr::dynamic_rendering::NAME,
];

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "default".to_string());
    let app_info = ApplicationInfo::new("vkbase Test");

    match mode.as_str() {
        "default" => run_default(&app_info),
        "headless" => run_headless(&app_info.with_api_version(vk::API_VERSION_1_0)),
        "custom-queue" => run_custom_queue(&app_info),
        "dynamic-rendering" => run_dynamic_rendering(&app_info),
        "window" => window::run(app_info),
        other => {
            print_help();
            anyhow::bail!("Unknown mode: {other}")
        }
    }
}

/// Builder with the switches every demo shares.
fn base_builder() -> AppBuilder {
    AppBuilder::new()
        .validation(cfg!(debug_assertions))
        .portability(cfg!(target_os = "macos"))
}

fn run_default(app_info: &ApplicationInfo) -> anyhow::Result<()> {
    let app = base_builder().build(app_info)?;

    let indices = app.queue_family_indices();
    info!(
        "Graphics family {}, compute family {}, unique {:?}",
        indices.graphics,
        indices.compute,
        indices.unique_indices()
    );

    Ok(())
}

fn run_headless(app_info: &ApplicationInfo) -> anyhow::Result<()> {
    let app_builder = base_builder().instance_extension(ash::ext::headless_surface::NAME);

    let app = AppWithSwapchainBuilder::new(app_builder).build(
        app_info,
        headless_surface(),
        HEADLESS_EXTENT,
    )?;

    log_swapchain(&app);
    Ok(())
}

fn log_swapchain(app: &AppWithSwapchain) {
    let swapchain = app.swapchain();
    info!(
        "Headless swapchain: {}x{}, {} images, {:?}",
        swapchain.extent().width,
        swapchain.extent().height,
        swapchain.images().len(),
        swapchain.format().format
    );
}

struct TransferQueueFamilyIndex {
    transfer: u32,
}

impl TransferQueueFamilyIndex {
    fn from_physical_device(device: PhysicalDeviceRef<'_>) -> vkbase::Result<Self> {
        (0_u32..)
            .zip(device.queue_family_properties())
            .find(|(_, properties)| properties.queue_flags.contains(vk::QueueFlags::TRANSFER))
            .map(|(transfer, _)| Self { transfer })
            .ok_or(VkBaseError::MissingQueueCapability(vk::QueueFlags::TRANSFER))
    }
}

struct TransferQueue {
    transfer: vk::Queue,
}

fn run_custom_queue(app_info: &ApplicationInfo) -> anyhow::Result<()> {
    let selection = QueueSelection::new(
        TransferQueueFamilyIndex::from_physical_device,
        |indices: &TransferQueueFamilyIndex| vec![indices.transfer],
        |indices: &TransferQueueFamilyIndex, source: &dyn QueueSource| TransferQueue {
            transfer: source.queue(indices.transfer, 0),
        },
    );

    let app = base_builder().queue_selection(selection).build(app_info)?;

    info!(
        "Transfer family {}, queue {:?}",
        app.queue_family_indices().transfer,
        app.queues().transfer
    );

    Ok(())
}

fn supports_dynamic_rendering(device: PhysicalDeviceRef<'_>) -> bool {
    let mut dynamic_rendering = vk::PhysicalDeviceDynamicRenderingFeaturesKHR::default();
    let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut dynamic_rendering);

    unsafe {
        device
            .instance()
            .get_physical_device_features2(device.handle(), &mut features2);
    }

    dynamic_rendering.dynamic_rendering == vk::TRUE
}

fn run_dynamic_rendering(app_info: &ApplicationInfo) -> anyhow::Result<()> {
    let app_builder = base_builder()
        .instance_extension(ash::ext::headless_surface::NAME)
        .physical_device_rater(|device| {
            if supports_dynamic_rendering(device) {
                default_physical_device_rater(device)
            } else {
                0
            }
        })
        .device_extensions(&DYNAMIC_RENDERING_EXTENSIONS)
        .device_features(DeviceFeatures::default().with_dynamic_rendering(
            vk::PhysicalDeviceDynamicRenderingFeaturesKHR::default().dynamic_rendering(true),
        ));

    let app = AppWithSwapchainBuilder::new(app_builder).build(
        app_info,
        headless_surface(),
        HEADLESS_EXTENT,
    )?;

    log_swapchain(&app);

    app.wait_idle()?;
    Ok(())
}

fn print_help() {
    eprintln!(
        "vkbase bring-up demos

USAGE:
    cargo run -p vkbase-demo -- [MODE]

MODES:
    default             Instance and device with graphics and compute queues
    headless            Vulkan 1.0 instance with a headless swapchain
    custom-queue        Device with a single transfer queue
    dynamic-rendering   Dynamic rendering device with a headless swapchain
    window              Window with a swapchain that follows resizes

Validation layers are enabled in debug builds, portability enumeration on macOS.

ENVIRONMENT VARIABLES:
    RUST_LOG            Set log level (e.g., info, debug, trace)"
    );
}

//! Windowed demo: swapchain bound to a winit window.

use ash::vk;
use std::sync::Arc;
use tracing::{error, info};
use vkbase::{
    required_surface_extensions, window_surface, AppWithSwapchain, AppWithSwapchainBuilder,
    ApplicationInfo,
};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// Open a window and keep its swapchain matched to the window size.
pub fn run(app_info: ApplicationInfo) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runner = WindowRunner {
        app_info,
        state: None,
    };

    event_loop.run_app(&mut runner)?;

    Ok(())
}

struct WindowRunner {
    app_info: ApplicationInfo,
    state: Option<WindowState>,
}

/// The swapchain app is declared first so it is dropped before the window.
struct WindowState {
    app: AppWithSwapchain,
    window: Arc<Window>,
}

impl ApplicationHandler for WindowRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Window ready");
            }
            Err(e) => {
                error!("Failed to initialize: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.state = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = state.handle_resize(size) {
                        error!("Resize error: {e}");
                    }
                }
            }
            _ => {}
        }
    }
}

impl WindowRunner {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<WindowState> {
        let window_attrs = Window::default_attributes()
            .with_title(self.app_info.application_name.as_str())
            .with_inner_size(PhysicalSize::new(WIDTH, HEIGHT));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let surface_extensions = required_surface_extensions(&*window)?;
        let app_builder = crate::base_builder().instance_extensions(&surface_extensions);

        let size = window.inner_size();
        let app = AppWithSwapchainBuilder::new(app_builder).build(
            &self.app_info,
            window_surface(&*window),
            vk::Extent2D {
                width: size.width,
                height: size.height,
            },
        )?;

        Ok(WindowState { app, window })
    }
}

impl WindowState {
    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> anyhow::Result<()> {
        // Minimized
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        self.app.recreate_swapchain(vk::Extent2D {
            width: size.width,
            height: size.height,
        })?;
        self.window.request_redraw();

        Ok(())
    }
}

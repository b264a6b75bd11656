use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuInit, GpuSurface};
use crate::render::{FrameRenderer, FrameStatus, RendererConfig};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "quadview".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
///
/// Opens one window, sets up a [`FrameRenderer`] for it and redraws on demand
/// until the window is closed. A renderer setup failure ends the loop and is
/// returned from [`run`](Self::run).
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, renderer: RendererConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, renderer);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// GPU objects tied to one window.
///
/// Field order is drop order: the renderer drains in-flight work before the
/// surface and device go away.
struct WindowGpu<'w> {
    renderer: FrameRenderer<Gpu>,
    surface: GpuSurface<'w>,
    gpu: Gpu,
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    state: WindowGpu<'this>,
}

fn init_window_gpu<'w>(
    window: &'w Window,
    gpu_init: GpuInit,
    config: &RendererConfig,
) -> Result<WindowGpu<'w>> {
    let (gpu, mut surface) =
        pollster::block_on(Gpu::new(window, gpu_init)).context("GPU initialization failed")?;

    let renderer =
        FrameRenderer::setup(&gpu, &mut surface, config).context("renderer setup failed")?;

    Ok(WindowGpu {
        renderer,
        surface,
        gpu,
    })
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    renderer: RendererConfig,

    window: Option<WindowEntry>,
    failure: Option<anyhow::Error>,
    exit_requested: bool,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, renderer: RendererConfig) -> Self {
        Self {
            config,
            gpu_init,
            renderer,
            window: None,
            failure: None,
            exit_requested: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        // Dropping the entry waits for the last frame.
        if let Some(entry) = self.window.take() {
            let stats = entry.with_state(|s| s.renderer.stats());
            log::info!(
                "closing after {} frames ({} skipped)",
                stats.presented,
                stats.skipped
            );
        }
        event_loop.exit();
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let renderer = &self.renderer;

        WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            state_builder: |w| init_window_gpu(w, gpu_init, renderer),
        }
        .try_build()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        let Some(entry) = self.window.as_mut() else {
            return Ok(());
        };

        entry.with_mut(|fields| {
            fields.clock.reset();
            let WindowGpu {
                renderer,
                surface,
                gpu,
            } = fields.state;
            surface.resize(new_size);
            renderer
                .on_resize(gpu, surface, new_size)
                .context("surface format change failed")
        })
    }

    fn redraw(&mut self) {
        let Some(entry) = self.window.as_mut() else {
            return;
        };

        entry.with_mut(|fields| {
            let ft = fields.clock.tick();
            fields.window.pre_present_notify();

            let WindowGpu {
                renderer, surface, ..
            } = fields.state;
            match renderer.on_frame(surface) {
                FrameStatus::Presented => log::trace!(
                    "frame {} dt {:?} avg {:?}",
                    ft.frame_index,
                    ft.dt,
                    fields.clock.average()
                ),
                FrameStatus::Skipped(reason) => {
                    log::trace!("frame {} skipped: {reason:?}", ft.frame_index)
                }
            }
        });
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.window = Some(entry);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Redraws are requested by resize and first show only.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let ours = self
            .window
            .as_ref()
            .is_some_and(|entry| entry.with_window(|w| w.id()) == window_id);
        if !ours {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.exit(event_loop)
            }

            WindowEvent::Resized(new_size) => {
                if let Err(err) = self.resize(new_size) {
                    self.fail(event_loop, err);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = self
                    .window
                    .as_ref()
                    .map(|entry| entry.with_window(|w| w.inner_size()));
                if let Some(new_size) = new_size {
                    if let Err(err) = self.resize(new_size) {
                        self.fail(event_loop, err);
                    }
                }
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.window = None;
    }
}

use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::backend::RenderSurface;
use super::frame::GpuDrawable;
use super::{Gpu, SurfaceErrorAction};

/// Window surface (swapchain) and its active configuration.
pub struct GpuSurface<'w> {
    window: &'w Window,

    /// Surface lifetime is tied to the window via `'w`.
    surface: wgpu::Surface<'w>,

    device: wgpu::Device,

    /// Formats this surface can present, in adapter preference order.
    formats: Vec<wgpu::TextureFormat>,

    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,
}

impl<'w> GpuSurface<'w> {
    pub(super) fn new(
        window: &'w Window,
        surface: wgpu::Surface<'w>,
        device: wgpu::Device,
        caps: wgpu::SurfaceCapabilities,
        config: wgpu::SurfaceConfiguration,
        size: PhysicalSize<u32>,
    ) -> Self {
        Self {
            window,
            surface,
            device,
            formats: caps.formats,
            config,
            size,
        }
    }

    /// Reconfigures the surface after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that case,
    /// only internal state is updated and configuration is deferred.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.configure();
    }

    fn configure(&self) {
        if self.size.width > 0 && self.size.height > 0 {
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        let action = map_surface_error(err);
        if action == SurfaceErrorAction::Reconfigured {
            self.configure();
        }
        action
    }
}

impl RenderSurface<Gpu> for GpuSurface<'_> {
    fn pixel_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn set_pixel_format(&mut self, format: wgpu::TextureFormat) {
        let applied = negotiate_format(&self.formats, format);
        if applied != format {
            log::warn!("surface cannot present {format:?}; using {applied:?}");
        }
        if applied == self.config.format {
            return;
        }

        self.config.format = applied;
        self.configure();
    }

    fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    fn current_drawable(&mut self) -> Option<GpuDrawable> {
        match self.surface.get_current_texture() {
            Ok(surface_texture) => Some(GpuDrawable::new(surface_texture)),
            Err(err) => {
                match self.handle_surface_error(err.clone()) {
                    SurfaceErrorAction::Fatal => log::error!("surface unusable: {err}"),
                    action => log::debug!("no drawable ({err}): {action:?}"),
                }
                None
            }
        }
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let preferred: &[wgpu::TextureFormat] = if prefer_srgb {
        &[
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ]
    } else {
        &[wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
    };

    preferred
        .iter()
        .copied()
        .find(|f| formats.contains(f))
        .or_else(|| formats.iter().copied().find(|f| f.is_srgb() == prefer_srgb))
        .or_else(|| formats.first().copied())
}

/// Picks `requested` when presentable, else the closest format with the same
/// sRGB encoding.
pub(crate) fn negotiate_format(
    formats: &[wgpu::TextureFormat],
    requested: wgpu::TextureFormat,
) -> wgpu::TextureFormat {
    if formats.is_empty() || formats.contains(&requested) {
        return requested;
    }
    choose_surface_format(formats, requested.is_srgb()).unwrap_or(requested)
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn map_surface_error(err: wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::assets::TextureImage;
use crate::render::PipelineDesc;

use super::backend::RenderDevice;
use super::frame::{GpuDrawable, GpuQueue};
use super::surface::{self, GpuSurface};
use super::GpuInit;

/// Owns the wgpu device and queue.
///
/// This is the wgpu side of [`RenderDevice`]:
/// - allocates vertex buffers and sampled textures
/// - links quad pipelines against the shared texture bind group layout
/// - hands out command queues (cheap clones of the device queue)
pub struct Gpu {
    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Group 0 layout: texture at binding 0, sampler at binding 1.
    texture_layout: wgpu::BindGroupLayout,

    /// Sampler shared by every texture.
    sampler: wgpu::Sampler,
}

/// A sampled 2D texture with its bind group.
pub struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    format: wgpu::TextureFormat,
}

impl GpuTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub(super) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

impl Gpu {
    /// Creates a device and a surface bound to `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new<'w>(window: &'w Window, init: GpuInit) -> Result<(Self, GpuSurface<'w>)> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            power_preference,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("quadview device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!("using adapter `{}` ({:?})", info.name, info.backend);

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps.formats, prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        let gpu_surface = GpuSurface::new(window, surface, device.clone(), caps, config, size);
        let gpu = Self::from_device(device, queue);
        Ok((gpu, gpu_surface))
    }

    /// Builds the shared texture binding layout and sampler on an existing device.
    pub(crate) fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadview texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quadview sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            device,
            queue,
            texture_layout,
            sampler,
        }
    }
}

impl RenderDevice for Gpu {
    type Buffer = wgpu::Buffer;
    type Texture = GpuTexture;
    type Pipeline = wgpu::RenderPipeline;
    type Drawable = GpuDrawable;
    type Queue = GpuQueue;

    fn make_command_queue(&self) -> Option<GpuQueue> {
        Some(GpuQueue::new(self.device.clone(), self.queue.clone()))
    }

    fn make_vertex_buffer(&self, label: &str, contents: &[u8]) -> Option<wgpu::Buffer> {
        if contents.is_empty() || contents.len() as u64 > self.device.limits().max_buffer_size {
            log::error!("{label}: {} bytes exceeds device buffer limits", contents.len());
            return None;
        }

        let buffer = scoped(&self.device, wgpu::ErrorFilter::OutOfMemory, || {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        match buffer {
            Ok(buffer) => Some(buffer),
            Err(err) => {
                log::error!("{label}: {err}");
                None
            }
        }
    }

    fn make_texture(&self, label: &str, image: &TextureImage) -> Option<GpuTexture> {
        let max = self.device.limits().max_texture_dimension_2d;
        if image.width == 0 || image.height == 0 || image.width > max || image.height > max {
            log::error!(
                "{label}: {}x{} outside device texture limits (max {max})",
                image.width,
                image.height
            );
            return None;
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let uploaded = scoped(&self.device, wgpu::ErrorFilter::OutOfMemory, || {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: image.format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });

            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &image.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(image.bytes_per_row()),
                    rows_per_image: Some(image.height),
                },
                size,
            );

            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quadview texture bind group"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            (texture, bind_group)
        });

        let (texture, bind_group) = match uploaded {
            Ok(parts) => parts,
            Err(err) => {
                log::error!("{label}: {err}");
                return None;
            }
        };

        Some(GpuTexture {
            texture,
            bind_group,
            format: image.format,
        })
    }

    fn texture_format(&self, texture: &GpuTexture) -> wgpu::TextureFormat {
        texture.format
    }

    fn make_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<wgpu::RenderPipeline, String> {
        // Validation errors land in the scope, not the uncaptured error handler.
        scoped(&self.device, wgpu::ErrorFilter::Validation, || self.link(desc))
            .map_err(|err| err.to_string())
    }
}

impl Gpu {
    fn link(&self, desc: &PipelineDesc<'_>) -> wgpu::RenderPipeline {
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.library.label()),
            source: wgpu::ShaderSource::Wgsl(desc.library.source().into()),
        });

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("quadview pipeline layout"),
                bind_group_layouts: &[&self.texture_layout],
                immediate_size: 0,
            });

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),

                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(&desc.vertex.name),
                    compilation_options: Default::default(),
                    buffers: desc.vertex_layouts,
                },

                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(&desc.fragment.name),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: desc.topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
    }
}

/// Runs `f` inside a wgpu error scope and returns the first error it captured.
fn scoped<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    f: impl FnOnce() -> T,
) -> Result<T, wgpu::Error> {
    let scope = device.push_error_scope(filter);
    let out = f();
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

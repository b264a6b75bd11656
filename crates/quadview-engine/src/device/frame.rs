use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::backend::{CommandBuffer, CommandQueue, RenderEncoder, Submission};
use super::gpu::GpuTexture;
use super::Gpu;

/// Represents a single acquired surface texture.
///
/// This object is short-lived and must be finalized promptly. Holding the surface
/// texture prevents acquisition of subsequent frames.
pub struct GpuDrawable {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

impl GpuDrawable {
    pub(super) fn new(surface_texture: wgpu::SurfaceTexture) -> Self {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            surface_texture,
            view,
        }
    }
}

/// Command-submission channel backed by the device queue.
pub struct GpuQueue {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuQueue {
    pub(super) fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

impl CommandQueue<Gpu> for GpuQueue {
    type CommandBuffer = GpuCommandBuffer;

    fn make_command_buffer(&self) -> Option<GpuCommandBuffer> {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadview frame encoder"),
            });

        Some(GpuCommandBuffer {
            device: self.device.clone(),
            queue: self.queue.clone(),
            encoder,
            drawable: None,
        })
    }
}

/// Command encoder plus the drawable scheduled for presentation.
pub struct GpuCommandBuffer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    encoder: wgpu::CommandEncoder,
    drawable: Option<GpuDrawable>,
}

impl CommandBuffer<Gpu> for GpuCommandBuffer {
    type Encoder<'a> = GpuRenderEncoder<'a>;
    type Submission = GpuSubmission;

    fn make_render_encoder<'a>(
        &'a mut self,
        target: &'a GpuDrawable,
    ) -> Option<GpuRenderEncoder<'a>> {
        let pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quadview pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Some(GpuRenderEncoder { pass })
    }

    fn present(&mut self, drawable: GpuDrawable) {
        self.drawable = Some(drawable);
    }

    /// Submits the encoder, then presents the scheduled drawable.
    ///
    /// wgpu requires the drawable's work to be submitted before `present`.
    fn commit(self) -> GpuSubmission {
        let Self {
            device,
            queue,
            encoder,
            drawable,
        } = self;

        let index = queue.submit(std::iter::once(encoder.finish()));

        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        queue.on_submitted_work_done(move || flag.store(true, Ordering::Release));

        if let Some(drawable) = drawable {
            drop(drawable.view);
            drawable.surface_texture.present();
        }

        GpuSubmission {
            device,
            index,
            done,
        }
    }
}

pub struct GpuRenderEncoder<'a> {
    pass: wgpu::RenderPass<'a>,
}

impl RenderEncoder<Gpu> for GpuRenderEncoder<'_> {
    fn set_pipeline(&mut self, pipeline: &wgpu::RenderPipeline) {
        self.pass.set_pipeline(pipeline);
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        self.pass.set_vertex_buffer(slot, buffer.slice(..));
    }

    fn set_fragment_texture(&mut self, slot: u32, texture: &GpuTexture) {
        self.pass.set_bind_group(slot, texture.bind_group(), &[]);
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn end_encoding(self) {
        drop(self.pass);
    }
}

/// Completion handle for one queue submission.
pub struct GpuSubmission {
    device: wgpu::Device,
    index: wgpu::SubmissionIndex,
    done: Arc<AtomicBool>,
}

impl Submission for GpuSubmission {
    fn is_complete(&self) -> bool {
        if !self.done.load(Ordering::Acquire) {
            // Callbacks only fire while the device is polled.
            if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
                log::warn!("device poll failed: {err}");
            }
        }
        self.done.load(Ordering::Acquire)
    }

    fn wait(self) {
        if let Err(err) = self
            .device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(self.index),
                timeout: None,
            })
        {
            log::warn!("waiting for frame completion failed: {err}");
        }
    }
}

use winit::dpi::PhysicalSize;

use crate::assets::{AssetBundle, TextureOptions};
use crate::device::{
    CommandBuffer, CommandQueue, RenderDevice, RenderEncoder, RenderSurface, Submission,
    SubmissionOf,
};
use crate::error::{SetupError, SetupResult};

use super::geometry::{POSITION_SLOT, QUAD_VERTEX_COUNT, TEXTURE_SLOT, TEX_COORD_SLOT};
use super::pipeline::PipelineBuilder;
use super::program::ProgramLibrary;
use super::resources::{QuadBuffers, ResourceFactory};

/// How `on_frame` paces GPU work.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum FramePacing {
    /// Block until the frame's command buffer has completed.
    #[default]
    Synchronous,
    /// Keep one frame in flight; wait for it before encoding the next.
    Pipelined,
}

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub assets: AssetBundle,
    pub asset_name: String,
    pub library: ProgramLibrary,
    pub vertex_program: String,
    pub fragment_program: String,
    pub texture: TextureOptions,
    pub pacing: FramePacing,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            assets: AssetBundle::from_dir("assets"),
            asset_name: "sample.png".to_string(),
            library: ProgramLibrary::default_library(),
            vertex_program: "vertex_main".to_string(),
            fragment_program: "fragment_main".to_string(),
            texture: TextureOptions::default(),
            pacing: FramePacing::default(),
        }
    }
}

/// Why a frame was not drawn.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    /// No pipeline is linked for the surface's current format.
    NoPipeline,
    NoDrawable,
    NoCommandBuffer,
    NoEncoder,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Presented,
    Skipped(SkipReason),
}

/// Running frame counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub presented: u64,
    pub skipped: u64,
}

/// Draws one textured full-screen quad per frame.
///
/// Construction through [`setup`](Self::setup) creates every GPU resource up
/// front; a `FrameRenderer` value therefore always has a queue, both vertex
/// buffers, the texture and a pipeline for the surface's format.
///
/// Only call from the thread driving the host's redraws. All methods take
/// `&mut self` and nothing is shared internally.
pub struct FrameRenderer<D: RenderDevice> {
    queue: D::Queue,
    buffers: QuadBuffers<D::Buffer>,
    texture: D::Texture,
    texture_format: wgpu::TextureFormat,
    pipelines: PipelineBuilder<D::Pipeline>,
    /// Format the surface presents in; a pipeline for it is always linked.
    active_format: wgpu::TextureFormat,
    pacing: FramePacing,
    in_flight: Option<SubmissionOf<D>>,
    stats: FrameStats,
}

impl<D: RenderDevice> FrameRenderer<D> {
    /// Creates the queue, texture, buffers and pipeline, and matches the
    /// surface's pixel format to the texture.
    pub fn setup<S>(device: &D, surface: &mut S, config: &RendererConfig) -> SetupResult<Self>
    where
        S: RenderSurface<D>,
    {
        let queue = device
            .make_command_queue()
            .ok_or(SetupError::NoCommandQueue)?;

        let factory = ResourceFactory::new(device);
        let texture = factory.load_texture(
            &config.assets,
            &config.asset_name,
            surface.scale_factor(),
            config.texture,
        )?;
        let buffers = factory.make_buffers()?;

        let texture_format = device.texture_format(&texture);
        surface.set_pixel_format(texture_format);
        let active_format = surface.pixel_format();

        let mut pipelines = PipelineBuilder::new(
            config.library.clone(),
            config.vertex_program.as_str(),
            config.fragment_program.as_str(),
        );
        pipelines.ensure(device, active_format)?;

        log::info!(
            "renderer ready: texture {texture_format:?}, surface {active_format:?}, {:?} pacing",
            config.pacing
        );

        Ok(Self {
            queue,
            buffers,
            texture,
            texture_format,
            pipelines,
            active_format,
            pacing: config.pacing,
            in_flight: None,
            stats: FrameStats::default(),
        })
    }

    /// Re-applies the texture's pixel format and asks for a redraw.
    ///
    /// Geometry is in clip space, so buffers and texture are untouched. A new
    /// pipeline is linked only when the surface ends up in a format none was
    /// built for. When linking fails the surface is put back on the previous
    /// format if it accepts it, and frames skip until a pipeline exists.
    pub fn on_resize<S>(
        &mut self,
        device: &D,
        surface: &mut S,
        new_size: PhysicalSize<u32>,
    ) -> SetupResult<()>
    where
        S: RenderSurface<D>,
    {
        surface.set_pixel_format(self.texture_format);
        let format = surface.pixel_format();

        if let Err(err) = self.pipelines.ensure(device, format) {
            surface.set_pixel_format(self.active_format);
            self.active_format = surface.pixel_format();
            log::warn!(
                "no pipeline for {format:?}, surface left at {:?}",
                self.active_format
            );
            return Err(err);
        }
        if format != self.active_format {
            log::info!(
                "surface format changed {:?} -> {format:?}",
                self.active_format
            );
            self.active_format = format;
        }

        log::debug!("resized to {}x{}", new_size.width, new_size.height);
        surface.request_redraw();
        Ok(())
    }

    /// Draws and presents one frame according to the configured pacing.
    ///
    /// A missing pipeline, drawable, command buffer or encoder skips the frame
    /// without touching any resource.
    pub fn on_frame<S>(&mut self, surface: &mut S) -> FrameStatus
    where
        S: RenderSurface<D>,
    {
        if let Some(previous) = self.in_flight.take() {
            if !previous.is_complete() {
                previous.wait();
            }
        }

        match self.submit_frame(surface) {
            Ok(submission) => {
                self.stats.presented += 1;
                match self.pacing {
                    FramePacing::Synchronous => submission.wait(),
                    FramePacing::Pipelined => self.in_flight = Some(submission),
                }
                FrameStatus::Presented
            }
            Err(reason) => {
                self.stats.skipped += 1;
                log::trace!("frame skipped: {reason:?}");
                FrameStatus::Skipped(reason)
            }
        }
    }

    /// Encodes, commits and schedules presentation of one frame without
    /// waiting, returning the completion handle.
    pub fn submit_frame<S>(&self, surface: &mut S) -> Result<SubmissionOf<D>, SkipReason>
    where
        S: RenderSurface<D>,
    {
        let Some(pipeline) = self.pipelines.get(self.active_format) else {
            return Err(SkipReason::NoPipeline);
        };
        let Some(drawable) = surface.current_drawable() else {
            return Err(SkipReason::NoDrawable);
        };
        let Some(mut commands) = self.queue.make_command_buffer() else {
            return Err(SkipReason::NoCommandBuffer);
        };

        {
            let Some(mut encoder) = commands.make_render_encoder(&drawable) else {
                return Err(SkipReason::NoEncoder);
            };

            encoder.set_pipeline(pipeline);
            encoder.set_vertex_buffer(POSITION_SLOT, &self.buffers.positions);
            encoder.set_vertex_buffer(TEX_COORD_SLOT, &self.buffers.tex_coords);
            encoder.set_fragment_texture(TEXTURE_SLOT, &self.texture);
            encoder.draw(0..QUAD_VERTEX_COUNT, 0..1);
            encoder.end_encoding();
        }

        commands.present(drawable);
        Ok(commands.commit())
    }

    /// Blocks until any in-flight frame has completed.
    pub fn finish(&mut self) {
        if let Some(submission) = self.in_flight.take() {
            submission.wait();
        }
    }

    pub fn buffers(&self) -> &QuadBuffers<D::Buffer> {
        &self.buffers
    }

    pub fn texture(&self) -> &D::Texture {
        &self.texture
    }

    /// Pixel format of the loaded texture, fixed at setup.
    pub fn texture_format(&self) -> wgpu::TextureFormat {
        self.texture_format
    }

    pub fn active_format(&self) -> wgpu::TextureFormat {
        self.active_format
    }

    /// Pipeline used for the current surface format.
    pub fn pipeline(&self) -> Option<&D::Pipeline> {
        self.pipelines.get(self.active_format)
    }

    /// Number of formats a pipeline has been linked for.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

impl<D: RenderDevice> Drop for FrameRenderer<D> {
    fn drop(&mut self) {
        self.finish();
        log::debug!(
            "renderer disposed after {} frames ({} skipped)",
            self.stats.presented,
            self.stats.skipped
        );
    }
}

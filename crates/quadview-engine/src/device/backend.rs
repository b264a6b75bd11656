//! Backend seam between the frame renderer and a GPU implementation.
//!
//! The renderer only talks to these traits. `Gpu`/`GpuSurface` implement them on
//! wgpu; `recording::RecordingDevice` implements them headlessly.

use std::ops::Range;

use crate::assets::TextureImage;
use crate::render::PipelineDesc;

/// Resource factory side of a GPU device.
///
/// Every `make_*` method returns `None` (or `Err`) when the device cannot provide
/// the resource; callers decide whether that is fatal.
pub trait RenderDevice: Sized {
    type Buffer;
    type Texture;
    type Pipeline;

    /// Per-frame presentable target handed out by a [`RenderSurface`].
    type Drawable;

    /// Command-submission channel.
    type Queue: CommandQueue<Self>;

    fn make_command_queue(&self) -> Option<Self::Queue>;

    /// Allocates an immutable vertex buffer holding exactly `contents`.
    fn make_vertex_buffer(&self, label: &str, contents: &[u8]) -> Option<Self::Buffer>;

    /// Uploads a decoded image into a sampled 2D texture.
    fn make_texture(&self, label: &str, image: &TextureImage) -> Option<Self::Texture>;

    fn texture_format(&self, texture: &Self::Texture) -> wgpu::TextureFormat;

    /// Links the described programs into a pipeline.
    ///
    /// The error string is the backend's link diagnostic.
    fn make_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<Self::Pipeline, String>;
}

pub trait CommandQueue<D: RenderDevice> {
    type CommandBuffer: CommandBuffer<D>;

    fn make_command_buffer(&self) -> Option<Self::CommandBuffer>;
}

/// One recorded batch of GPU work.
pub trait CommandBuffer<D: RenderDevice> {
    type Encoder<'a>: RenderEncoder<D>
    where
        Self: 'a,
        D: 'a;

    type Submission: Submission;

    /// Opens a render pass whose single color attachment is `target`.
    fn make_render_encoder<'a>(&'a mut self, target: &'a D::Drawable)
    -> Option<Self::Encoder<'a>>;

    /// Schedules `drawable` for presentation once this buffer executes.
    fn present(&mut self, drawable: D::Drawable);

    /// Submits the buffer for execution.
    fn commit(self) -> Self::Submission;
}

pub trait RenderEncoder<D: RenderDevice> {
    fn set_pipeline(&mut self, pipeline: &D::Pipeline);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &D::Buffer);
    fn set_fragment_texture(&mut self, slot: u32, texture: &D::Texture);

    /// Issues a non-indexed draw using the bound pipeline's topology.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    fn end_encoding(self);
}

/// Completion handle for a committed command buffer.
pub trait Submission {
    /// Non-blocking completion check.
    fn is_complete(&self) -> bool;

    /// Blocks until the GPU has finished the submitted work.
    fn wait(self);
}

/// Host-owned presentable surface.
pub trait RenderSurface<D: RenderDevice> {
    fn pixel_format(&self) -> wgpu::TextureFormat;

    /// Requests a new pixel format.
    ///
    /// Implementations may settle on a different format when the requested one
    /// cannot be presented; read [`pixel_format`](Self::pixel_format) afterwards.
    fn set_pixel_format(&mut self, format: wgpu::TextureFormat);

    /// Display scale factor used to pick asset variants.
    fn scale_factor(&self) -> f64;

    /// Acquires the drawable for the current frame, if one is available.
    fn current_drawable(&mut self) -> Option<D::Drawable>;

    /// Asks the host to schedule a redraw.
    fn request_redraw(&self);
}

/// Completion type produced by committing one of `D`'s command buffers.
pub type SubmissionOf<D> = <<<D as RenderDevice>::Queue as CommandQueue<D>>::CommandBuffer as CommandBuffer<D>>::Submission;

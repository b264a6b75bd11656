//! Textured-quad rendering.
//!
//! `FrameRenderer` owns the quad's GPU resources and runs the per-frame
//! encode/commit/present sequence against any [`RenderDevice`](crate::device::RenderDevice).
//!
//! Convention:
//! - geometry is clip space and covers the whole viewport at any surface size
//! - the pipeline output format always tracks the surface's presentable format

mod frame;
pub mod geometry;
mod pipeline;
mod program;
mod resources;

pub use frame::{FramePacing, FrameRenderer, FrameStats, FrameStatus, RendererConfig, SkipReason};
pub use pipeline::{PipelineBuilder, PipelineDesc};
pub use program::{Program, ProgramLibrary, ProgramStage};
pub use resources::{QuadBuffers, ResourceFactory};

//! GPU device + surface management.
//!
//! This module is responsible for:
//! - the backend traits the frame renderer is written against
//! - creating the wgpu Adapter/Device/Queue and the window Surface
//! - acquiring drawables, encoding passes and waiting on submissions
//! - a headless recording backend with the same traits

pub mod backend;
mod error;
mod frame;
mod gpu;
mod init;
pub mod recording;
mod surface;

pub use backend::{
    CommandBuffer, CommandQueue, RenderDevice, RenderEncoder, RenderSurface, Submission,
    SubmissionOf,
};
pub use error::SurfaceErrorAction;
pub use frame::{GpuCommandBuffer, GpuDrawable, GpuQueue, GpuRenderEncoder, GpuSubmission};
pub use gpu::{Gpu, GpuTexture};
pub use init::GpuInit;
pub use surface::GpuSurface;

//! Quadview engine crate.
//!
//! Draws a single texture-mapped quad covering a window surface. The frame
//! renderer is written against the traits in [`device::backend`]; the wgpu
//! backend drives a real window, the [`device::recording`] backend records
//! calls for headless use.

pub mod assets;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;

pub use error::{SetupError, SetupResult};
pub use render::{FramePacing, FrameRenderer, FrameStatus, RendererConfig, SkipReason};

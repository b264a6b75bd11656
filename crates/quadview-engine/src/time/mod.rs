//! Frame timing.
//!
//! With synchronous pacing the interval between presented frames is the GPU
//! frame time plus submission overhead; `FrameClock` measures it for diagnostics.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};

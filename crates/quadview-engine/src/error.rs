use crate::render::ProgramStage;

pub type SetupResult<T> = Result<T, SetupError>;

/// Broken startup precondition. Rendering cannot proceed after any of these.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("device did not provide a command queue")]
    NoCommandQueue,

    #[error("failed to allocate {label} ({len} bytes)")]
    BufferAllocation { label: &'static str, len: usize },

    #[error("asset `{name}` not found in bundle (tried {tried:?})")]
    AssetNotFound { name: String, tried: Vec<String> },

    #[error("asset `{name}` could not be decoded")]
    AssetDecode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("asset `{name}` could not be read")]
    AssetRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to allocate texture for `{name}` ({width}x{height})")]
    TextureAllocation { name: String, width: u32, height: u32 },

    #[error("program `{name}` not found in `{library}`")]
    ProgramNotFound { name: String, library: String },

    #[error("program `{name}` is a {found} program, expected {expected}")]
    ProgramStage {
        name: String,
        expected: ProgramStage,
        found: ProgramStage,
    },

    #[error("failed to link pipeline for {format:?}: {message}")]
    PipelineLink {
        format: wgpu::TextureFormat,
        message: String,
    },
}

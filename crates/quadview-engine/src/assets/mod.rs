//! Named image assets.
//!
//! Assets are resolved by name (with optional `@Nx` scale variants) from a
//! directory or an in-memory map, then decoded to RGBA8 for texture upload.

mod bundle;
mod decode;

pub use bundle::{AssetBundle, ResolvedAsset};
pub use decode::{decode_texture, TextureImage, TextureOptions};

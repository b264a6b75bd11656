use crate::error::{SetupError, SetupResult};

use super::ResolvedAsset;

/// Decoding options for texture assets.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureOptions {
    /// Treat the image as sRGB-encoded color.
    pub srgb: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self { srgb: true }
    }
}

impl TextureOptions {
    pub fn format(&self) -> wgpu::TextureFormat {
        if self.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}

/// Tightly packed RGBA8 pixels ready for upload.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Scale variant the image was resolved for (`@2x` -> 2).
    pub scale: u32,
    pub format: wgpu::TextureFormat,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    pub fn bytes_per_row(&self) -> u32 {
        4 * self.width
    }
}

pub fn decode_texture(asset: ResolvedAsset, options: TextureOptions) -> SetupResult<TextureImage> {
    let ResolvedAsset { name, scale, bytes } = asset;

    let rgba = match image::load_from_memory(&bytes) {
        Ok(img) => img.to_rgba8(),
        Err(source) => return Err(SetupError::AssetDecode { name, source }),
    };
    let (width, height) = rgba.dimensions();

    Ok(TextureImage {
        name,
        width,
        height,
        scale,
        format: options.format(),
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn asset(bytes: Vec<u8>) -> ResolvedAsset {
        ResolvedAsset {
            name: "sample.png".into(),
            scale: 1,
            bytes,
        }
    }

    #[test]
    fn decodes_png_to_rgba8() {
        let tex = decode_texture(asset(png(3, 2)), TextureOptions::default()).unwrap();
        assert_eq!((tex.width, tex.height), (3, 2));
        assert_eq!(tex.pixels.len(), 3 * 2 * 4);
        assert_eq!(&tex.pixels[..4], &[10, 20, 30, 255]);
        assert_eq!(tex.bytes_per_row(), 12);
    }

    #[test]
    fn srgb_option_selects_format() {
        let srgb = decode_texture(asset(png(1, 1)), TextureOptions { srgb: true }).unwrap();
        let linear = decode_texture(asset(png(1, 1)), TextureOptions { srgb: false }).unwrap();
        assert_eq!(srgb.format, wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(linear.format, wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode_texture(asset(b"definitely not a png".to_vec()), TextureOptions::default())
            .unwrap_err();
        assert!(matches!(err, SetupError::AssetDecode { ref name, .. } if name == "sample.png"));
    }
}

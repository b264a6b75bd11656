use crate::assets::{self, AssetBundle, TextureOptions};
use crate::device::RenderDevice;
use crate::error::{SetupError, SetupResult};

use super::geometry;

/// The two immutable vertex buffers of the quad.
#[derive(Debug)]
pub struct QuadBuffers<B> {
    pub positions: B,
    pub tex_coords: B,
}

/// Creates the renderer's GPU-resident resources on a device.
pub struct ResourceFactory<'d, D> {
    device: &'d D,
}

impl<'d, D: RenderDevice> ResourceFactory<'d, D> {
    pub fn new(device: &'d D) -> Self {
        Self { device }
    }

    /// Allocates the position and texture-coordinate buffers.
    pub fn make_buffers(&self) -> SetupResult<QuadBuffers<D::Buffer>> {
        Ok(QuadBuffers {
            positions: self.buffer("quadview position vbo", geometry::position_bytes())?,
            tex_coords: self.buffer("quadview tex coord vbo", geometry::tex_coord_bytes())?,
        })
    }

    /// Resolves, decodes and uploads the named image asset.
    pub fn load_texture(
        &self,
        bundle: &AssetBundle,
        name: &str,
        scale_factor: f64,
        options: TextureOptions,
    ) -> SetupResult<D::Texture> {
        let resolved = bundle.resolve(name, scale_factor)?;
        let image = assets::decode_texture(resolved, options)?;

        log::info!(
            "loaded texture `{}` {}x{} @{}x ({:?})",
            image.name,
            image.width,
            image.height,
            image.scale,
            image.format
        );

        self.device
            .make_texture(&image.name, &image)
            .ok_or_else(|| SetupError::TextureAllocation {
                name: image.name.clone(),
                width: image.width,
                height: image.height,
            })
    }

    fn buffer(&self, label: &'static str, contents: &[u8]) -> SetupResult<D::Buffer> {
        self.device
            .make_vertex_buffer(label, contents)
            .ok_or(SetupError::BufferAllocation {
                label,
                len: contents.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::device::recording::RecordingDevice;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn buffers_hold_quad_geometry() {
        let device = RecordingDevice::new();
        let buffers = ResourceFactory::new(&device).make_buffers().unwrap();

        assert_eq!(buffers.positions.contents.len(), 64);
        assert_eq!(buffers.tex_coords.contents.len(), 32);
        assert_eq!(
            buffers.positions.as_floats(),
            &[
                -1.0, -1.0, 0.0, 1.0, //
                1.0, -1.0, 0.0, 1.0, //
                -1.0, 1.0, 0.0, 1.0, //
                1.0, 1.0, 0.0, 1.0,
            ]
        );
        assert_eq!(
            buffers.tex_coords.as_floats(),
            &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn buffer_failure_names_the_buffer() {
        let device = RecordingDevice::new();
        device.journal_mut().fail_buffers = true;

        let err = ResourceFactory::new(&device).make_buffers().unwrap_err();
        assert!(matches!(err, SetupError::BufferAllocation { len: 64, .. }));
    }

    #[test]
    fn texture_uses_scaled_variant() {
        let device = RecordingDevice::new();
        let bundle = AssetBundle::in_memory()
            .with_asset("sample.png", png(2, 2))
            .with_asset("sample@2x.png", png(4, 4));

        let tex = ResourceFactory::new(&device)
            .load_texture(&bundle, "sample.png", 2.0, TextureOptions::default())
            .unwrap();
        assert_eq!((tex.width, tex.height), (4, 4));
        assert_eq!(tex.name, "sample@2x.png");
        assert_eq!(tex.format, wgpu::TextureFormat::Rgba8UnormSrgb);
    }

    #[test]
    fn texture_allocation_failure_is_fatal() {
        let device = RecordingDevice::new();
        device.journal_mut().fail_textures = true;
        let bundle = AssetBundle::in_memory().with_asset("sample.png", png(3, 5));

        let err = ResourceFactory::new(&device)
            .load_texture(&bundle, "sample.png", 1.0, TextureOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SetupError::TextureAllocation {
                width: 3,
                height: 5,
                ..
            }
        ));
    }

    #[test]
    fn missing_asset_is_fatal() {
        let device = RecordingDevice::new();
        let err = ResourceFactory::new(&device)
            .load_texture(&AssetBundle::in_memory(), "sample.png", 1.0, TextureOptions::default())
            .unwrap_err();
        assert!(matches!(err, SetupError::AssetNotFound { .. }));
        assert_eq!(device.journal().textures_made, 0);
    }
}

//! Full-screen quad geometry.
//!
//! Positions are clip-space (x, y, z, w) in triangle-strip order; texture
//! coordinates follow the same order with a top-left image origin.

/// Number of vertices in the quad strip.
pub const QUAD_VERTEX_COUNT: u32 = 4;

pub static QUAD_POSITIONS: [[f32; 4]; 4] = [
    [-1.0, -1.0, 0.0, 1.0],
    [1.0, -1.0, 0.0, 1.0],
    [-1.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
];

pub static QUAD_TEX_COORDS: [[f32; 2]; 4] = [
    [0.0, 1.0],
    [1.0, 1.0],
    [0.0, 0.0],
    [1.0, 0.0],
];

/// Vertex slot the position buffer is bound to.
pub const POSITION_SLOT: u32 = 0;
/// Vertex slot the texture-coordinate buffer is bound to.
pub const TEX_COORD_SLOT: u32 = 1;
/// Fragment slot the quad texture is bound to.
pub const TEXTURE_SLOT: u32 = 0;

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];
const TEX_COORD_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

pub fn position_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&QUAD_POSITIONS)
}

pub fn tex_coord_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&QUAD_TEX_COORDS)
}

/// Buffer layouts indexed by vertex slot.
pub fn vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
    [
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 4]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &POSITION_ATTRS,
        },
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &TEX_COORD_ATTRS,
        },
    ]
}

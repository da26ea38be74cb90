//! Vertex formats accepted by the geometry buffer.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};
use static_assertions::const_assert_eq;

/// A vertex type that can be stored in a [`GeometryBuffer`](crate::GeometryBuffer).
///
/// The stride must be a multiple of [`wgpu::COPY_BUFFER_ALIGNMENT`] so that
/// any run of vertices can be uploaded with a single buffer write.
pub trait Vertex: Pod + Send + Sync {
    /// Returns the wgpu vertex buffer layout for this vertex type.
    fn layout() -> wgpu::VertexBufferLayout<'static>;

    /// Size of one vertex in bytes.
    const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

/// Position + color vertex, used for untextured shapes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPositionColor {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<VertexPositionColor>(), 28);

impl VertexPositionColor {
    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }
}

impl Vertex for VertexPositionColor {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            // location 0: position (vec3)
            0 => Float32x3,
            // location 1: color (vec4)
            1 => Float32x4,
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexPositionColor>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

/// Position + color + texture coordinate vertex, used for sprites.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPositionColorTexture {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coords: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<VertexPositionColorTexture>(), 36);

impl VertexPositionColorTexture {
    pub fn new(position: Vec3, color: Vec4, tex_coords: Vec2) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
            tex_coords: tex_coords.to_array(),
        }
    }
}

impl Vertex for VertexPositionColorTexture {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            // location 0: position (vec3)
            0 => Float32x3,
            // location 1: color (vec4)
            1 => Float32x4,
            // location 2: tex_coords (vec2)
            2 => Float32x2,
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexPositionColorTexture>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_stride_matches_size() {
        assert_eq!(VertexPositionColor::layout().array_stride, VertexPositionColor::SIZE);
        assert_eq!(
            VertexPositionColorTexture::layout().array_stride,
            VertexPositionColorTexture::SIZE
        );
    }

    #[test]
    fn test_texture_vertex_attribute_offsets() {
        let layout = VertexPositionColorTexture::layout();
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 28]);
    }

    #[test]
    fn test_constructor_from_glam() {
        let v = VertexPositionColor::new(Vec3::new(1.0, 2.0, 3.0), Vec4::ONE);
        assert_eq!(v.position, [1.0, 2.0, 3.0]);
        assert_eq!(v.color, [1.0; 4]);
    }
}

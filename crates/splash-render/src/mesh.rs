//! CPU-side geometry: vertex formats, index data and the sphere and plane
//! generators the scene builds its meshes from.

use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Mesh vertex with position, normal and UV coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    /// Vertex buffer layout, one vertex per vertex.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One point of a point cloud. Points are drawn as camera-facing quads, so
/// this is stepped per instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl PointVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn new(position: Vec3, color: [f32; 3]) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }

    /// Vertex buffer layout, one point per instance.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Latitude/longitude sphere centered on the origin.
    ///
    /// Rows run from the north pole (+Y) to the south pole; the degenerate
    /// triangles at both poles are skipped.
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);
        let stride = ws + 1;

        let mut vertices = Vec::with_capacity((stride * (hs + 1)) as usize);
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            let polar = v * PI;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let azimuth = u * TAU;
                let normal = Vec3::new(
                    -azimuth.cos() * polar.sin(),
                    polar.cos(),
                    azimuth.sin() * polar.sin(),
                );
                vertices.push(MeshVertex {
                    position: (normal * radius).to_array(),
                    normal: normal.to_array(),
                    uv: [u, 1.0 - v],
                });
            }
        }

        let mut indices = Vec::with_capacity((ws * (hs - 1) * 6) as usize);
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * stride + ix + 1;
                let b = iy * stride + ix;
                let c = (iy + 1) * stride + ix;
                let d = (iy + 1) * stride + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    /// Subdivided plane in the XY plane facing +Z, centered on the origin.
    ///
    /// Vertices are row-major from the top edge; UV `(0, 1)` is the top-left
    /// corner.
    pub fn plane(width: f32, height: f32, segments: u32) -> Self {
        let n = segments.max(1);
        let stride = n + 1;

        let mut vertices = Vec::with_capacity((stride * stride) as usize);
        for iy in 0..=n {
            let v = iy as f32 / n as f32;
            let y = height * 0.5 - v * height;
            for ix in 0..=n {
                let u = ix as f32 / n as f32;
                let x = u * width - width * 0.5;
                vertices.push(MeshVertex {
                    position: [x, y, 0.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [u, 1.0 - v],
                });
            }
        }

        let mut indices = Vec::with_capacity((n * n * 6) as usize);
        for iy in 0..n {
            for ix in 0..n {
                let a = iy * stride + ix;
                let b = (iy + 1) * stride + ix;
                let c = (iy + 1) * stride + ix + 1;
                let d = iy * stride + ix + 1;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self { vertices, indices }
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

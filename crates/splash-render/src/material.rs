//! Material descriptions and the uniform blocks the built-in shaders read.
//!
//! A material is described once when its ledger entry is created. Per-frame
//! values (model matrix, opacity) travel with the draw and are packed into
//! the uniform structs here just before upload.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Convert a `0xRRGGBB` value to RGB components in `[0, 1]`.
pub fn rgb_from_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// How a transparent draw combines with what is already in the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Blending {
    /// Alpha-over.
    #[default]
    Normal,
    /// Source scaled by alpha, added to the target.
    Additive,
}

/// Point sprites with a world-space size.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsMaterial {
    /// Quad edge length in world units (shrinks with distance).
    pub size: f32,
    /// Color used when `vertex_colors` is off, multiplied otherwise.
    pub color: [f32; 3],
    /// Take each point's color from its vertex.
    pub vertex_colors: bool,
    pub blending: Blending,
}

/// Lit surface with a metalness/roughness response and an optional map.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    pub color: [f32; 3],
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
}

/// Unlit, flat colored surface.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicMaterial {
    pub color: [f32; 3],
    pub blending: Blending,
}

/// Caller-supplied WGSL with one uniform block at `@group(1) @binding(0)`.
///
/// The module must export `vs_main` and `fs_main`, read the frame uniforms at
/// `@group(0)` and take [`MeshVertex`](crate::MeshVertex) input.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderMaterial {
    /// Pipeline label.
    pub label: &'static str,
    /// WGSL source.
    pub source: &'static str,
    /// Size in bytes of the uniform block.
    pub uniform_size: u64,
    pub double_sided: bool,
    pub depth_write: bool,
    pub blending: Blending,
}

/// Everything a material ledger entry can describe.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialDesc {
    Points(PointsMaterial),
    Standard(StandardMaterial),
    Basic(BasicMaterial),
    Shader(ShaderMaterial),
}

impl MaterialDesc {
    /// Whether draws with this material write depth and ignore blending.
    pub fn is_opaque(&self) -> bool {
        matches!(self, MaterialDesc::Standard(_))
    }
}

/// Per-frame values shared by every draw: lights and fog.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct EnvironmentUniform {
    /// Ambient color premultiplied by intensity (w unused).
    pub ambient: [f32; 4],
    /// Direction the key light travels (w unused).
    pub light_direction: [f32; 4],
    /// Key light color premultiplied by intensity (w unused).
    pub light_color: [f32; 4],
    /// Fog color (w unused).
    pub fog_color: [f32; 4],
    /// Fog near and far distances in x and y.
    pub fog_range: [f32; 4],
}

/// Uniform block for standard and basic meshes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    /// Base color in rgb, opacity in w.
    pub color: [f32; 4],
    /// Emissive color premultiplied by intensity.
    pub emissive: [f32; 4],
    /// Metalness, roughness, 1.0 when a map is bound, 1.0 when lit.
    pub surface: [f32; 4],
}

impl MeshUniform {
    pub fn standard(model: Mat4, material: &StandardMaterial, opacity: f32, textured: bool) -> Self {
        let e = material.emissive;
        let k = material.emissive_intensity;
        Self {
            model: model.to_cols_array_2d(),
            color: [material.color[0], material.color[1], material.color[2], opacity],
            emissive: [e[0] * k, e[1] * k, e[2] * k, 0.0],
            surface: [
                material.metalness,
                material.roughness,
                if textured { 1.0 } else { 0.0 },
                1.0,
            ],
        }
    }

    pub fn basic(model: Mat4, material: &BasicMaterial, opacity: f32) -> Self {
        let c = material.color;
        Self {
            model: model.to_cols_array_2d(),
            color: [c[0], c[1], c[2], opacity],
            emissive: [0.0; 4],
            surface: [0.0; 4],
        }
    }
}

/// Uniform block for point clouds.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointsUniform {
    /// Material color in rgb, opacity in w.
    pub color: [f32; 4],
    /// Size, 1.0 when vertex colors are used.
    pub params: [f32; 4],
}

impl PointsUniform {
    pub fn new(material: &PointsMaterial, opacity: f32) -> Self {
        let c = material.color;
        Self {
            color: [c[0], c[1], c[2], opacity],
            params: [
                material.size,
                if material.vertex_colors { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

//! Aurora ribbon: a subdivided plane whose vertices ripple with time and whose
//! fragments blend a three-color gradient with a horizontal wave.
//!
//! Reduced motion is a uniform toggle rather than a second shader: when the
//! `animated` flag is off the vertex phase is pinned to zero and the wave term
//! to a constant. [`AuroraSurface::displacement`] and
//! [`AuroraSurface::fragment_color`] mirror the shader on the CPU.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use splash_render::{Blending, MeshData, ShaderMaterial};

use crate::color::rgb_from_hex;

/// Plane width in world units.
pub const AURORA_WIDTH: f32 = 60.0;
/// Plane height in world units.
pub const AURORA_HEIGHT: f32 = 30.0;
/// Segments along each axis.
pub const AURORA_SEGMENTS: u32 = 64;
/// Wave term used when motion is reduced.
pub const STATIC_WAVE: f32 = 0.2;

/// WGSL source for the aurora material.
pub const AURORA_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
};

struct Aurora {
    color1: vec4<f32>,
    color2: vec4<f32>,
    color3: vec4<f32>,
    model: mat4x4<f32>,
    time: f32,
    animated: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var<uniform> aurora: Aurora;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var p = in.position;
    let phase = select(0.0, aurora.time * 0.6, aurora.animated > 0.5);
    p.y = p.y + sin((p.x + p.y) * 0.2 + phase) * 0.6;
    var out: VertexOutput;
    out.clip = camera.view_proj * aurora.model * vec4<f32>(p, 1.0);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let g = smoothstep(0.0, 1.0, in.uv.y);
    let moving = sin(in.uv.x * 8.0 + aurora.time * 1.2) * 0.5 + 0.5;
    let wave = select(0.2, moving, aurora.animated > 0.5);
    var col = mix(aurora.color1.rgb, aurora.color2.rgb, g);
    col = mix(col, aurora.color3.rgb, wave * 0.6);
    let alpha = 0.35 * (1.0 - smoothstep(0.0, 0.12, abs(in.uv.y - 0.5)));
    return vec4<f32>(col, alpha);
}
"#;

/// Uniform block matching `Aurora` in [`AURORA_SHADER_SOURCE`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct AuroraUniform {
    /// Bottom gradient color (teal).
    pub color1: [f32; 4],
    /// Top gradient color (purple).
    pub color2: [f32; 4],
    /// Wave highlight color (pink).
    pub color3: [f32; 4],
    /// Model matrix, column-major.
    pub model: [[f32; 4]; 4],
    /// Accumulated time in seconds.
    pub time: f32,
    /// 1.0 when animated, 0.0 under reduced motion.
    pub animated: f32,
    /// Padding to a 16-byte multiple.
    pub _pad: [f32; 2],
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// The aurora plane and its time uniform.
#[derive(Debug, Clone)]
pub struct AuroraSurface {
    /// World position of the plane's center.
    pub position: Vec3,
    colors: [[f32; 3]; 3],
    time: f32,
    animated: bool,
}

impl AuroraSurface {
    /// The splash aurora at (0, 10, -30) in teal, purple and pink.
    pub fn new(animated: bool) -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, -30.0),
            colors: [
                rgb_from_hex(0x06b6d4),
                rgb_from_hex(0x7c3aed),
                rgb_from_hex(0xec4899),
            ],
            time: 0.0,
            animated,
        }
    }

    /// Set the shader time uniform.
    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    /// Current shader time.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Whether the ripple and wave are animated.
    pub fn is_animated(&self) -> bool {
        self.animated
    }

    /// Vertical displacement of a local vertex at the current time.
    pub fn displacement(&self, x: f32, y: f32) -> f32 {
        let phase = if self.animated { self.time * 0.6 } else { 0.0 };
        ((x + y) * 0.2 + phase).sin() * 0.6
    }

    /// Fragment color (RGBA) at a UV coordinate at the current time.
    pub fn fragment_color(&self, uv: Vec2) -> [f32; 4] {
        let g = smoothstep(0.0, 1.0, uv.y);
        let wave = if self.animated {
            (uv.x * 8.0 + self.time * 1.2).sin() * 0.5 + 0.5
        } else {
            STATIC_WAVE
        };
        let col = mix3(self.colors[0], self.colors[1], g);
        let col = mix3(col, self.colors[2], wave * 0.6);
        let alpha = 0.35 * (1.0 - smoothstep(0.0, 0.12, (uv.y - 0.5).abs()));
        [col[0], col[1], col[2], alpha]
    }

    /// Undisplaced plane, row-major from the top edge; the ripple is applied
    /// in the vertex shader.
    pub fn mesh(&self) -> MeshData {
        MeshData::plane(AURORA_WIDTH, AURORA_HEIGHT, AURORA_SEGMENTS)
    }

    /// Transparent, double-sided shader material that leaves depth untouched.
    pub fn material(&self) -> ShaderMaterial {
        ShaderMaterial {
            label: "aurora",
            source: AURORA_SHADER_SOURCE,
            uniform_size: std::mem::size_of::<AuroraUniform>() as u64,
            double_sided: true,
            depth_write: false,
            blending: Blending::Normal,
        }
    }

    /// Uniform block for upload.
    pub fn uniform(&self) -> AuroraUniform {
        let [c1, c2, c3] = self.colors;
        AuroraUniform {
            color1: [c1[0], c1[1], c1[2], 1.0],
            color2: [c2[0], c2[1], c2[2], 1.0],
            color3: [c3[0], c3[1], c3[2], 1.0],
            model: glam::Mat4::from_translation(self.position).to_cols_array_2d(),
            time: self.time,
            animated: if self.animated { 1.0 } else { 0.0 },
            _pad: [0.0; 2],
        }
    }
}

//! Scene pass pipelines: lit and unlit meshes, camera-facing point sprites,
//! and pipelines built from caller-supplied shader materials.
//!
//! Every pipeline reads the frame uniforms (camera, lights, fog) at group 0
//! and one per-draw uniform block at group 1. Standard meshes additionally
//! bind a surface map and sampler at group 1.

use crate::bloom::HDR_FORMAT;
use crate::material::{Blending, ShaderMaterial};
use crate::mesh::{MeshVertex, PointVertex};

/// WGSL for standard and basic meshes.
pub const MESH_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
};

struct Environment {
    ambient: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
    fog_color: vec4<f32>,
    fog_range: vec4<f32>,
};

struct Mesh {
    model: mat4x4<f32>,
    color: vec4<f32>,
    emissive: vec4<f32>,
    surface: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> env: Environment;
@group(1) @binding(0) var<uniform> mesh: Mesh;
@group(1) @binding(1) var surface_map: texture_2d<f32>;
@group(1) @binding(2) var surface_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = mesh.model * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip = camera.view_proj * world;
    out.world_pos = world.xyz;
    out.normal = normalize((mesh.model * vec4<f32>(in.normal, 0.0)).xyz);
    out.uv = in.uv;
    return out;
}

fn apply_fog(color: vec3<f32>, world_pos: vec3<f32>) -> vec3<f32> {
    let dist = length(world_pos - camera.camera_pos.xyz);
    let span = max(env.fog_range.y - env.fog_range.x, 1e-4);
    let f = clamp((dist - env.fog_range.x) / span, 0.0, 1.0);
    return mix(color, env.fog_color.rgb, f);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(surface_map, surface_sampler, in.uv).rgb;
    let base = mesh.color.rgb * select(vec3<f32>(1.0), texel, mesh.surface.z > 0.5);

    let n = normalize(in.normal);
    let l = -normalize(env.light_direction.xyz);
    let v = normalize(camera.camera_pos.xyz - in.world_pos);
    let h = normalize(l + v);
    let metalness = mesh.surface.x;
    let roughness = clamp(mesh.surface.y, 0.04, 1.0);

    let n_dot_l = max(dot(n, l), 0.0);
    let diffuse = base * (1.0 - metalness) * (env.ambient.rgb + env.light_color.rgb * n_dot_l);
    let shininess = mix(128.0, 2.0, roughness);
    let f0 = mix(vec3<f32>(0.04), base, metalness);
    let specular = f0 * pow(max(dot(n, h), 0.0), shininess) * (1.0 - roughness) * n_dot_l;
    let lit = diffuse + specular * env.light_color.rgb + base * metalness * env.ambient.rgb;

    var color = select(base, lit, mesh.surface.w > 0.5) + mesh.emissive.rgb;
    color = apply_fog(color, in.world_pos);
    return vec4<f32>(color, mesh.color.a);
}
"#;

/// WGSL for point clouds drawn as camera-facing quads, one instance per point.
pub const POINTS_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
};

struct Environment {
    ambient: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
    fog_color: vec4<f32>,
    fog_range: vec4<f32>,
};

struct Points {
    color: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> env: Environment;
@group(1) @binding(0) var<uniform> points: Points;

struct PointInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) world_pos: vec3<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) corner: u32, in: PointInput) -> VertexOutput {
    var offsets = array<vec2<f32>, 6>(
        vec2(-0.5, -0.5), vec2(0.5, -0.5), vec2(0.5, 0.5),
        vec2(-0.5, -0.5), vec2(0.5, 0.5), vec2(-0.5, 0.5),
    );
    let offset = offsets[corner] * points.params.x;
    let world = in.position + camera.right.xyz * offset.x + camera.up.xyz * offset.y;
    var out: VertexOutput;
    out.clip = camera.view_proj * vec4<f32>(world, 1.0);
    out.color = select(points.color.rgb, in.color * points.color.rgb, points.params.y > 0.5);
    out.world_pos = world;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(in.world_pos - camera.camera_pos.xyz);
    let span = max(env.fog_range.y - env.fog_range.x, 1e-4);
    let f = clamp((dist - env.fog_range.x) / span, 0.0, 1.0);
    return vec4<f32>(mix(in.color, env.fog_color.rgb, f), points.color.a);
}
"#;

/// Vertices per point quad.
pub const POINT_QUAD_VERTICES: u32 = 6;

/// Depth buffer for the scene pass.
pub struct DepthBuffer {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Far plane.
    pub const CLEAR_VALUE: f32 = 1.0;

    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// No-op if dimensions are unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        *self = Self::new(device, width, height);
    }
}

/// Blend state for a transparent draw.
pub fn blend_state(blending: Blending) -> wgpu::BlendState {
    match blending {
        Blending::Normal => wgpu::BlendState::ALPHA_BLENDING,
        Blending::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    }
}

/// How a pipeline treats depth and faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RasterState {
    blend: Option<Blending>,
    depth_write: bool,
    cull_back: bool,
}

/// Bind group layouts and the fixed pipelines of the scene pass.
pub struct ScenePipelines {
    pub frame_bgl: wgpu::BindGroupLayout,
    /// One uniform buffer.
    pub object_bgl: wgpu::BindGroupLayout,
    /// Uniform buffer, surface map and sampler.
    pub textured_bgl: wgpu::BindGroupLayout,
    pub standard: wgpu::RenderPipeline,
    pub basic_normal: wgpu::RenderPipeline,
    pub basic_additive: wgpu::RenderPipeline,
    pub points_normal: wgpu::RenderPipeline,
    pub points_additive: wgpu::RenderPipeline,
    object_layout: wgpu::PipelineLayout,
}

impl ScenePipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bgl"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });
        let object_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bgl"),
            entries: &[uniform_entry(0)],
        });
        let textured_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("textured-object-bgl"),
            entries: &[
                uniform_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let object_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("object-layout"),
            bind_group_layouts: &[&frame_bgl, &object_bgl],
            immediate_size: 0,
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("textured-object-layout"),
            bind_group_layouts: &[&frame_bgl, &textured_bgl],
            immediate_size: 0,
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh-shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_SHADER_SOURCE.into()),
        });
        let points_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("points-shader"),
            source: wgpu::ShaderSource::Wgsl(POINTS_SHADER_SOURCE.into()),
        });

        // Basic meshes share the textured layout so one shader serves both.
        let mesh_pipeline = |label, raster| {
            create_scene_pipeline(
                device,
                label,
                &mesh_shader,
                &textured_layout,
                MeshVertex::layout(),
                raster,
            )
        };
        let points_pipeline = |label, blending| {
            create_scene_pipeline(
                device,
                label,
                &points_shader,
                &object_layout,
                PointVertex::layout(),
                RasterState {
                    blend: Some(blending),
                    depth_write: false,
                    cull_back: false,
                },
            )
        };

        Self {
            standard: mesh_pipeline(
                "standard-pipeline",
                RasterState {
                    blend: None,
                    depth_write: true,
                    cull_back: true,
                },
            ),
            basic_normal: mesh_pipeline(
                "basic-pipeline",
                RasterState {
                    blend: Some(Blending::Normal),
                    depth_write: false,
                    cull_back: true,
                },
            ),
            basic_additive: mesh_pipeline(
                "basic-additive-pipeline",
                RasterState {
                    blend: Some(Blending::Additive),
                    depth_write: false,
                    cull_back: true,
                },
            ),
            points_normal: points_pipeline("points-pipeline", Blending::Normal),
            points_additive: points_pipeline("points-additive-pipeline", Blending::Additive),
            frame_bgl,
            object_bgl,
            textured_bgl,
            object_layout,
        }
    }

    /// The basic mesh pipeline for a blend mode.
    pub fn basic(&self, blending: Blending) -> &wgpu::RenderPipeline {
        match blending {
            Blending::Normal => &self.basic_normal,
            Blending::Additive => &self.basic_additive,
        }
    }

    /// The point cloud pipeline for a blend mode.
    pub fn points(&self, blending: Blending) -> &wgpu::RenderPipeline {
        match blending {
            Blending::Normal => &self.points_normal,
            Blending::Additive => &self.points_additive,
        }
    }

    /// Compile a shader material into its own pipeline.
    pub fn shader_material(
        &self,
        device: &wgpu::Device,
        material: &ShaderMaterial,
    ) -> wgpu::RenderPipeline {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(material.label),
            source: wgpu::ShaderSource::Wgsl(material.source.into()),
        });
        create_scene_pipeline(
            device,
            material.label,
            &module,
            &self.object_layout,
            MeshVertex::layout(),
            RasterState {
                blend: Some(material.blending),
                depth_write: material.depth_write,
                cull_back: !material.double_sided,
            },
        )
    }
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
    raster: RasterState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: raster.cull_back.then_some(wgpu::Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: raster.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: raster.blend.map(blend_state),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_blend_keeps_destination() {
        let state = blend_state(Blending::Additive);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend_state(Blending::Normal), wgpu::BlendState::ALPHA_BLENDING);
    }

    #[test]
    fn test_shaders_declare_matching_frame_block() {
        for source in [MESH_SHADER_SOURCE, POINTS_SHADER_SOURCE] {
            assert!(source.contains("@group(0) @binding(0) var<uniform> camera: Camera;"));
            assert!(source.contains("@group(0) @binding(1) var<uniform> env: Environment;"));
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_main"));
        }
    }

    #[test]
    fn test_point_quad_is_two_triangles() {
        assert_eq!(POINT_QUAD_VERTICES, 6);
        assert!(POINTS_SHADER_SOURCE.contains("array<vec2<f32>, 6>"));
    }
}

//! Bloom post-processing on the GPU.
//!
//! The scene renders into an HDR target owned here. Bright pixels are
//! extracted into the first level of a half-resolution mip chain, each level
//! is a blurred downsample of the one above, and the composite pass adds the
//! weighted levels back onto the scene while writing the frame target.

use wgpu::util::DeviceExt;

use crate::composer::{BLOOM_MIP_LEVELS, BloomParams, Composer};

/// Format of the scene target and the mip chain.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Width of the threshold's soft edge in luminance.
pub const THRESHOLD_SMOOTH_WIDTH: f32 = 0.01;

/// WGSL for the extract, downsample and composite passes.
pub const BLOOM_SHADER_SOURCE: &str = r#"
struct BloomParams {
    strength: f32,
    radius: f32,
    threshold: f32,
    _pad: f32,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: BloomParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@group(1) @binding(2) var mip0: texture_2d<f32>;
@group(1) @binding(3) var mip1: texture_2d<f32>;
@group(1) @binding(4) var mip2: texture_2d<f32>;
@group(1) @binding(5) var mip3: texture_2d<f32>;
@group(1) @binding(6) var mip4: texture_2d<f32>;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_extract(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(input_tex, input_sampler, in.uv);
    let luminance = dot(texel.rgb, vec3<f32>(0.299, 0.587, 0.114));
    let weight = smoothstep(params.threshold, params.threshold + 0.01, luminance);
    return vec4<f32>(texel.rgb * weight, texel.a * weight);
}

@fragment
fn fs_downsample(in: VertexOutput) -> @location(0) vec4<f32> {
    let dims = vec2<f32>(textureDimensions(input_tex));
    let texel = (0.5 + params.radius) / dims;
    let a = textureSample(input_tex, input_sampler, in.uv + vec2(-texel.x, -texel.y));
    let b = textureSample(input_tex, input_sampler, in.uv + vec2( texel.x, -texel.y));
    let c = textureSample(input_tex, input_sampler, in.uv + vec2(-texel.x,  texel.y));
    let d = textureSample(input_tex, input_sampler, in.uv + vec2( texel.x,  texel.y));
    return (a + b + c + d) * 0.25;
}

fn level_weight(level: f32) -> f32 {
    let factor = 1.0 - 0.2 * level;
    return mix(factor, 1.2 - factor, params.radius);
}

@fragment
fn fs_composite(in: VertexOutput) -> @location(0) vec4<f32> {
    let scene = textureSample(input_tex, input_sampler, in.uv);
    let glow = level_weight(0.0) * textureSample(mip0, input_sampler, in.uv)
        + level_weight(1.0) * textureSample(mip1, input_sampler, in.uv)
        + level_weight(2.0) * textureSample(mip2, input_sampler, in.uv)
        + level_weight(3.0) * textureSample(mip3, input_sampler, in.uv)
        + level_weight(4.0) * textureSample(mip4, input_sampler, in.uv);
    let bloom = glow * params.strength;
    let alpha = clamp(scene.a + max(max(bloom.r, bloom.g), bloom.b), 0.0, 1.0);
    return vec4<f32>(scene.rgb + bloom.rgb, alpha);
}
"#;

/// Luminance weight the extract pass gives a linear color.
pub fn bright_pass_weight(rgb: [f32; 3], threshold: f32) -> f32 {
    let luminance = rgb[0] * 0.299 + rgb[1] * 0.587 + rgb[2] * 0.114;
    let t = ((luminance - threshold) / THRESHOLD_SMOOTH_WIDTH).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Composite weight of mip `level`: the base falloff mirrored toward the
/// small levels as `radius` grows.
pub fn level_weight(level: usize, radius: f32) -> f32 {
    let factor = 1.0 - 0.2 * level as f32;
    factor + (1.2 - 2.0 * factor) * radius
}

struct Target {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// GPU half of the composer: scene target, mip chain and the passes over them.
pub struct BloomPipeline {
    #[allow(dead_code)]
    params_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    composite_bgl: wgpu::BindGroupLayout,
    extract_pipeline: wgpu::RenderPipeline,
    downsample_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    params: BloomParams,
    scene: Target,
    scene_bind_group: wgpu::BindGroup,
    mips: Vec<Target>,
    mip_bind_groups: Vec<wgpu::BindGroup>,
    composite_bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

impl BloomPipeline {
    /// Create the pipeline for the composer's current size, writing into
    /// targets of `target_format`.
    pub fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        composer: &Composer,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bloom-shader"),
            source: wgpu::ShaderSource::Wgsl(BLOOM_SHADER_SOURCE.into()),
        });

        let params_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-params-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(16),
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-texture-bgl"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        let mut composite_entries = vec![texture_entry(0), sampler_entry(1)];
        composite_entries.extend((0..BLOOM_MIP_LEVELS as u32).map(|i| texture_entry(2 + i)));
        let composite_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-composite-bgl"),
            entries: &composite_entries,
        });

        let chain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-chain-layout"),
            bind_group_layouts: &[&params_bgl, &texture_bgl],
            immediate_size: 0,
        });
        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-composite-layout"),
            bind_group_layouts: &[&params_bgl, &composite_bgl],
            immediate_size: 0,
        });

        let extract_pipeline = create_fullscreen_pipeline(
            device,
            &shader,
            &chain_layout,
            "fs_extract",
            HDR_FORMAT,
            "bloom-extract",
        );
        let downsample_pipeline = create_fullscreen_pipeline(
            device,
            &shader,
            &chain_layout,
            "fs_downsample",
            HDR_FORMAT,
            "bloom-downsample",
        );
        let composite_pipeline = create_fullscreen_pipeline(
            device,
            &shader,
            &composite_layout,
            "fs_composite",
            target_format,
            "bloom-composite",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let params = composer.bloom().params();
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bloom-params"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom-params-bg"),
            layout: &params_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        let size = composer.drawing_buffer_size();
        let scene = create_target(device, "scene-hdr", size);
        let scene_bind_group = texture_bind_group(device, &texture_bgl, &sampler, &scene.view);
        let mips: Vec<Target> = composer
            .bloom()
            .mip_sizes()
            .iter()
            .map(|&mip| create_target(device, "bloom-mip", mip))
            .collect();
        let mip_bind_groups = mips
            .iter()
            .map(|mip| texture_bind_group(device, &texture_bgl, &sampler, &mip.view))
            .collect();
        let composite_bind_group =
            composite_bind_group(device, &composite_bgl, &sampler, &scene, &mips);

        Self {
            params_bgl,
            texture_bgl,
            composite_bgl,
            extract_pipeline,
            downsample_pipeline,
            composite_pipeline,
            sampler,
            params_buffer,
            params_bind_group,
            params,
            scene,
            scene_bind_group,
            mips,
            mip_bind_groups,
            composite_bind_group,
            size,
        }
    }

    /// View the scene pass renders into.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.scene.view
    }

    /// Size of the scene target in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Follow the composer: rebuild targets after a resize and upload changed
    /// parameters. Returns `true` when targets were rebuilt.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, composer: &Composer) -> bool {
        let params = composer.bloom().params();
        if bytemuck::bytes_of(&params) != bytemuck::bytes_of(&self.params) {
            queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
            self.params = params;
        }

        let size = composer.drawing_buffer_size();
        if size == self.size {
            return false;
        }
        self.scene = create_target(device, "scene-hdr", size);
        self.scene_bind_group =
            texture_bind_group(device, &self.texture_bgl, &self.sampler, &self.scene.view);
        self.mips = composer
            .bloom()
            .mip_sizes()
            .iter()
            .map(|&mip| create_target(device, "bloom-mip", mip))
            .collect();
        self.mip_bind_groups = self
            .mips
            .iter()
            .map(|mip| texture_bind_group(device, &self.texture_bgl, &self.sampler, &mip.view))
            .collect();
        self.composite_bind_group = composite_bind_group(
            device,
            &self.composite_bgl,
            &self.sampler,
            &self.scene,
            &self.mips,
        );
        self.size = size;
        tracing::debug!(width = size.0, height = size.1, "bloom targets rebuilt");
        true
    }

    /// Run extract, downsample and composite. `target` ends up holding the
    /// scene with bloom added.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        self.run_pass(
            encoder,
            &self.extract_pipeline,
            &self.scene_bind_group,
            &self.mips[0].view,
            "bloom-extract",
        );
        for i in 1..self.mips.len() {
            self.run_pass(
                encoder,
                &self.downsample_pipeline,
                &self.mip_bind_groups[i - 1],
                &self.mips[i].view,
                "bloom-downsample",
            );
        }
        self.run_pass(
            encoder,
            &self.composite_pipeline,
            &self.composite_bind_group,
            target,
            "bloom-composite",
        );
    }

    fn run_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
        label: &str,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.params_bind_group, &[]);
        pass.set_bind_group(1, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    target_format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

fn create_target(device: &wgpu::Device, label: &str, (width, height): (u32, u32)) -> Target {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HDR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Target { texture, view }
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bloom-texture-bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn composite_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    scene: &Target,
    mips: &[Target],
) -> wgpu::BindGroup {
    let mut entries = vec![
        wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(&scene.view),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::Sampler(sampler),
        },
    ];
    entries.extend(mips.iter().enumerate().map(|(i, mip)| wgpu::BindGroupEntry {
        binding: 2 + i as u32,
        resource: wgpu::BindingResource::TextureView(&mip.view),
    }));
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bloom-composite-bg"),
        layout,
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bright_pixels_pass_threshold() {
        assert_eq!(bright_pass_weight([1.0, 1.0, 1.0], 0.85), 1.0);
        assert_eq!(bright_pass_weight([0.3, 0.3, 0.3], 0.85), 0.0);
    }

    #[test]
    fn test_threshold_edge_is_smooth() {
        let w = bright_pass_weight([0.855, 0.855, 0.855], 0.85);
        assert!(w > 0.0 && w < 1.0, "weight {w} at the soft edge");
    }

    #[test]
    fn test_level_weights_follow_radius() {
        // Radius 0 keeps the base falloff, radius 1 mirrors it.
        assert!((level_weight(0, 0.0) - 1.0).abs() < 1e-6);
        assert!((level_weight(4, 0.0) - 0.2).abs() < 1e-6);
        assert!((level_weight(0, 1.0) - 0.2).abs() < 1e-6);
        assert!((level_weight(4, 1.0) - 1.0).abs() < 1e-6);
        let mid = level_weight(2, 0.6);
        assert!((mid - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_composite_binds_every_mip_level() {
        assert_eq!(BLOOM_MIP_LEVELS, 5);
        assert!(BLOOM_SHADER_SOURCE.contains("mip4"));
    }
}

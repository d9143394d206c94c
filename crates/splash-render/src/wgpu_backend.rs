//! wgpu implementation of [`RenderBackend`].
//!
//! Ledger entries become real buffers, textures and pipelines in
//! [`create`](RenderBackend::create) and are destroyed in
//! [`destroy`](RenderBackend::destroy). Each frame renders the scene into the
//! bloom pipeline's HDR target at the composer's drawing buffer size, then the
//! bloom passes write the frame target.
//!
//! A material's uniform buffer holds one draw's values per frame, so every
//! draw uses its own material entry.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::backend::{FrameSnapshot, MeshDraw, PointsDraw, RenderBackend};
use crate::bloom::BloomPipeline;
use crate::camera::CameraUniform;
use crate::composer::Composer;
use crate::gpu::{FrameTarget, RenderContext, SurfaceError};
use crate::material::{Blending, EnvironmentUniform, MaterialDesc, MeshUniform, PointsUniform};
use crate::mesh::{MeshData, PointVertex};
use crate::pipelines::{DepthBuffer, POINT_QUAD_VERTICES, ScenePipelines};
use crate::resources::{ResourceData, ResourceId, ResourceKind};

/// Format of uploaded surface maps.
pub const MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

struct MaterialObject {
    desc: MaterialDesc,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Map the bind group currently samples; `None` is the white fallback.
    bound_map: Option<ResourceId>,
    /// Compiled program of a shader material.
    pipeline: Option<wgpu::RenderPipeline>,
}

enum GpuObject {
    Points {
        buffer: wgpu::Buffer,
        capacity: usize,
    },
    Mesh {
        vertices: wgpu::Buffer,
        indices: wgpu::Buffer,
        index_count: u32,
    },
    Material(MaterialObject),
    Texture {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
    /// Renderer and composer entries; their state lives in the backend itself.
    Owned(ResourceKind),
}

impl GpuObject {
    fn destroy(self) {
        match self {
            GpuObject::Points { buffer, .. } => buffer.destroy(),
            GpuObject::Mesh {
                vertices, indices, ..
            } => {
                vertices.destroy();
                indices.destroy();
            }
            GpuObject::Material(material) => material.uniform.destroy(),
            GpuObject::Texture { texture, .. } => texture.destroy(),
            GpuObject::Owned(_) => {}
        }
    }
}

/// One entry of the encoded draw list.
#[derive(Clone, Copy)]
enum DrawRef {
    Mesh(usize),
    Points(usize),
}

struct GpuState {
    ctx: RenderContext,
    pipelines: ScenePipelines,
    bloom: Option<BloomPipeline>,
    depth: Option<DepthBuffer>,
    camera_buffer: wgpu::Buffer,
    environment_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    white_map: wgpu::TextureView,
    map_sampler: wgpu::Sampler,
    objects: HashMap<ResourceId, GpuObject>,
}

/// Presents frames with wgpu into a window surface or an offscreen texture.
pub struct WgpuBackend {
    state: Option<GpuState>,
    logical_size: (u32, u32),
    frames_presented: u64,
    frames_skipped: u64,
}

impl WgpuBackend {
    /// Build the scene pipelines and frame uniforms on an initialized context.
    pub fn new(ctx: RenderContext) -> Self {
        let device = &ctx.device;
        let pipelines = ScenePipelines::new(device);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera-uniform"),
            contents: bytemuck::bytes_of(&CameraUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let environment_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("environment-uniform"),
            contents: bytemuck::bytes_of(&EnvironmentUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bg"),
            layout: &pipelines.frame_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: environment_buffer.as_entire_binding(),
                },
            ],
        });

        let white = upload_map(&ctx, "white-map", 1, 1, &[255, 255, 255, 255]);
        let white_map = white.create_view(&wgpu::TextureViewDescriptor::default());
        let map_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("map-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        tracing::info!(format = ?ctx.target_format, "wgpu backend ready");
        Self {
            state: Some(GpuState {
                ctx,
                pipelines,
                bloom: None,
                depth: None,
                camera_buffer,
                environment_buffer,
                frame_bind_group,
                white_map,
                map_sampler,
                objects: HashMap::new(),
            }),
            logical_size: (0, 0),
            frames_presented: 0,
            frames_skipped: 0,
        }
    }

    /// Resize the frame target to the window's physical size.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        if let Some(state) = self.state.as_mut() {
            state.ctx.resize(width, height);
        }
    }

    /// Frames submitted and presented.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Frames dropped because the target could not be acquired.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Objects built from ledger entries and not yet destroyed.
    pub fn live_objects(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.objects.len())
    }

    /// Logical size last passed to `set_size`.
    pub fn logical_size(&self) -> (u32, u32) {
        self.logical_size
    }

    /// Whether the drawing context has been released.
    pub fn is_disposed(&self) -> bool {
        self.state.is_none()
    }
}

impl GpuState {
    fn build_material(&self, desc: &MaterialDesc) -> MaterialObject {
        let device = &self.ctx.device;
        let size = match desc {
            MaterialDesc::Points(_) => std::mem::size_of::<PointsUniform>() as u64,
            MaterialDesc::Standard(_) | MaterialDesc::Basic(_) => {
                std::mem::size_of::<MeshUniform>() as u64
            }
            MaterialDesc::Shader(shader) => shader.uniform_size.max(16),
        };
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("material-uniform"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = match desc {
            MaterialDesc::Points(_) | MaterialDesc::Shader(_) => {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("material-bg"),
                    layout: &self.pipelines.object_bgl,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform.as_entire_binding(),
                    }],
                })
            }
            MaterialDesc::Standard(_) | MaterialDesc::Basic(_) => {
                self.textured_bind_group(&uniform, &self.white_map)
            }
        };
        let pipeline = match desc {
            MaterialDesc::Shader(shader) => Some(self.pipelines.shader_material(device, shader)),
            _ => None,
        };
        MaterialObject {
            desc: desc.clone(),
            uniform,
            bind_group,
            bound_map: None,
            pipeline,
        }
    }

    fn textured_bind_group(&self, uniform: &wgpu::Buffer, map: &wgpu::TextureView) -> wgpu::BindGroup {
        self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("textured-material-bg"),
            layout: &self.pipelines.textured_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(map),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.map_sampler),
                },
            ],
        })
    }

    fn build(&self, id: ResourceId, kind: ResourceKind, data: &ResourceData) -> Option<GpuObject> {
        let device = &self.ctx.device;
        let object = match data {
            ResourceData::None => GpuObject::Owned(kind),
            ResourceData::Points(points) => {
                let zero = [PointVertex::new(glam::Vec3::ZERO, [0.0; 3])];
                let contents: &[PointVertex] = if points.is_empty() {
                    &zero
                } else {
                    points.as_slice()
                };
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("points-buffer"),
                    contents: bytemuck::cast_slice(contents),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                GpuObject::Points {
                    buffer,
                    capacity: points.len(),
                }
            }
            ResourceData::Mesh(mesh) => build_mesh(device, mesh)?,
            ResourceData::Material(desc) => GpuObject::Material(self.build_material(desc)),
            ResourceData::Texture {
                width,
                height,
                rgba,
            } => {
                let expected = *width as usize * *height as usize * 4;
                if *width == 0 || *height == 0 || rgba.len() != expected {
                    tracing::warn!(?id, width, height, bytes = rgba.len(), "texture data malformed");
                    return None;
                }
                let texture = upload_map(&self.ctx, "surface-map", *width, *height, rgba);
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                GpuObject::Texture { texture, view }
            }
        };
        Some(object)
    }

    /// Write this frame's uniforms and point data, and rebind maps that changed.
    fn prepare(&mut self, frame: &FrameSnapshot) {
        for draw in &frame.meshes {
            self.rebind_map(draw);
        }

        let queue = &self.ctx.queue;
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&frame.camera));
        queue.write_buffer(
            &self.environment_buffer,
            0,
            bytemuck::bytes_of(&frame.environment),
        );

        for draw in &frame.meshes {
            let Some(GpuObject::Material(material)) = self.objects.get(&draw.material) else {
                continue;
            };
            match &material.desc {
                MaterialDesc::Standard(standard) => {
                    let textured = material.bound_map.is_some();
                    let uniform = MeshUniform::standard(draw.transform, standard, draw.opacity, textured);
                    queue.write_buffer(&material.uniform, 0, bytemuck::bytes_of(&uniform));
                }
                MaterialDesc::Basic(basic) => {
                    let uniform = MeshUniform::basic(draw.transform, basic, draw.opacity);
                    queue.write_buffer(&material.uniform, 0, bytemuck::bytes_of(&uniform));
                }
                MaterialDesc::Shader(_) => {
                    if let Some(bytes) = &draw.uniforms {
                        queue.write_buffer(&material.uniform, 0, bytes);
                    }
                }
                MaterialDesc::Points(_) => {
                    tracing::warn!(name = draw.name, "points material on a mesh draw");
                }
            }
        }

        for draw in &frame.points {
            if let Some(GpuObject::Material(material)) = self.objects.get(&draw.material)
                && let MaterialDesc::Points(points) = &material.desc
            {
                let uniform = PointsUniform::new(points, draw.opacity);
                queue.write_buffer(&material.uniform, 0, bytemuck::bytes_of(&uniform));
            }
            if let (Some(vertices), Some(GpuObject::Points { buffer, capacity })) =
                (&draw.vertices, self.objects.get(&draw.geometry))
            {
                let n = vertices.len().min(*capacity);
                if n > 0 {
                    queue.write_buffer(buffer, 0, bytemuck::cast_slice(&vertices[..n]));
                }
            }
        }
    }

    fn rebind_map(&mut self, draw: &MeshDraw) {
        let wanted = draw
            .texture
            .filter(|id| matches!(self.objects.get(id), Some(GpuObject::Texture { .. })));
        let needs_rebind = match self.objects.get(&draw.material) {
            Some(GpuObject::Material(material)) => {
                matches!(material.desc, MaterialDesc::Standard(_)) && material.bound_map != wanted
            }
            _ => false,
        };
        if !needs_rebind {
            return;
        }
        let view = match wanted.and_then(|id| self.objects.get(&id)) {
            Some(GpuObject::Texture { view, .. }) => view,
            _ => &self.white_map,
        };
        let Some(GpuObject::Material(material)) = self.objects.get(&draw.material) else {
            return;
        };
        let bind_group = self.textured_bind_group(&material.uniform, view);
        if let Some(GpuObject::Material(material)) = self.objects.get_mut(&draw.material) {
            material.bind_group = bind_group;
            material.bound_map = wanted;
            tracing::debug!(name = draw.name, map = ?wanted, "surface map bound");
        }
    }

    fn material_desc(&self, id: ResourceId) -> Option<&MaterialDesc> {
        match self.objects.get(&id) {
            Some(GpuObject::Material(material)) => Some(&material.desc),
            _ => None,
        }
    }

    /// Opaque meshes, normal-blended points, transparent meshes back to
    /// front, then additive points.
    fn draw_order(&self, frame: &FrameSnapshot) -> Vec<DrawRef> {
        let camera = glam::Vec3::new(
            frame.camera.camera_pos[0],
            frame.camera.camera_pos[1],
            frame.camera.camera_pos[2],
        );

        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for (i, draw) in frame.meshes.iter().enumerate() {
            match self.material_desc(draw.material) {
                Some(desc) if desc.is_opaque() => opaque.push(DrawRef::Mesh(i)),
                Some(_) => {
                    let distance = draw.transform.w_axis.truncate().distance(camera);
                    transparent.push((distance, DrawRef::Mesh(i)));
                }
                None => {}
            }
        }
        transparent.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut normal_points = Vec::new();
        let mut additive_points = Vec::new();
        for (i, draw) in frame.points.iter().enumerate() {
            match self.material_desc(draw.material) {
                Some(MaterialDesc::Points(p)) if p.blending == Blending::Additive => {
                    additive_points.push(DrawRef::Points(i));
                }
                Some(MaterialDesc::Points(_)) => normal_points.push(DrawRef::Points(i)),
                _ => {}
            }
        }

        let mut order = opaque;
        order.append(&mut normal_points);
        order.extend(transparent.into_iter().map(|(_, d)| d));
        order.append(&mut additive_points);
        order
    }

    fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameSnapshot,
        order: &[DrawRef],
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(DepthBuffer::CLEAR_VALUE),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for draw in order {
            match *draw {
                DrawRef::Mesh(i) => self.encode_mesh(&mut pass, &frame.meshes[i]),
                DrawRef::Points(i) => self.encode_points(&mut pass, &frame.points[i]),
            }
        }
    }

    fn encode_mesh(&self, pass: &mut wgpu::RenderPass<'_>, draw: &MeshDraw) {
        let (
            Some(GpuObject::Mesh {
                vertices,
                indices,
                index_count,
            }),
            Some(GpuObject::Material(material)),
        ) = (self.objects.get(&draw.geometry), self.objects.get(&draw.material))
        else {
            tracing::trace!(name = draw.name, "mesh draw skipped: objects missing");
            return;
        };
        let pipeline = match &material.desc {
            MaterialDesc::Standard(_) => &self.pipelines.standard,
            MaterialDesc::Basic(basic) => self.pipelines.basic(basic.blending),
            MaterialDesc::Shader(_) => match &material.pipeline {
                Some(pipeline) => pipeline,
                None => return,
            },
            MaterialDesc::Points(_) => return,
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(1, &material.bind_group, &[]);
        pass.set_vertex_buffer(0, vertices.slice(..));
        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..*index_count, 0, 0..1);
    }

    fn encode_points(&self, pass: &mut wgpu::RenderPass<'_>, draw: &PointsDraw) {
        let (
            Some(GpuObject::Points { buffer, capacity }),
            Some(GpuObject::Material(material)),
        ) = (self.objects.get(&draw.geometry), self.objects.get(&draw.material))
        else {
            tracing::trace!(name = draw.name, "points draw skipped: objects missing");
            return;
        };
        let MaterialDesc::Points(points) = &material.desc else {
            return;
        };
        let count = draw.count.min(*capacity) as u32;
        if count == 0 {
            return;
        }
        pass.set_pipeline(self.pipelines.points(points.blending));
        pass.set_bind_group(1, &material.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.draw(0..POINT_QUAD_VERTICES, 0..count);
    }
}

fn build_mesh(device: &wgpu::Device, mesh: &MeshData) -> Option<GpuObject> {
    if mesh.vertices.is_empty() || mesh.indices.is_empty() {
        tracing::warn!("empty mesh not uploaded");
        return None;
    }
    let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh-vertices"),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh-indices"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    Some(GpuObject::Mesh {
        vertices,
        indices,
        index_count: mesh.indices.len() as u32,
    })
}

fn upload_map(
    ctx: &RenderContext,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: MAP_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: None,
        },
        size,
    );
    texture
}

impl RenderBackend for WgpuBackend {
    fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width, height);
        tracing::trace!(width, height, "backend resized");
    }

    fn create(&mut self, id: ResourceId, kind: ResourceKind, data: &ResourceData) {
        let Some(state) = self.state.as_mut() else {
            tracing::warn!(?id, ?kind, "create after dispose ignored");
            return;
        };
        if let Some(object) = state.build(id, kind, data)
            && let Some(previous) = state.objects.insert(id, object)
        {
            previous.destroy();
        }
    }

    fn destroy(&mut self, id: ResourceId) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        match state.objects.remove(&id) {
            Some(object) => object.destroy(),
            None => tracing::warn!(?id, "destroy of unknown object"),
        }
    }

    fn render(&mut self, composer: &Composer, frame: &FrameSnapshot) {
        let Some(state) = self.state.as_mut() else {
            tracing::warn!(frame = frame.frame, "render after dispose ignored");
            return;
        };

        let (width, height) = composer.drawing_buffer_size();
        if width == 0 || height == 0 {
            return;
        }
        if matches!(state.ctx.target, FrameTarget::Offscreen { .. }) {
            state.ctx.resize(width, height);
        }
        match state.bloom.as_mut() {
            Some(bloom) => {
                bloom.sync(&state.ctx.device, &state.ctx.queue, composer);
            }
            None => {
                state.bloom = Some(BloomPipeline::new(
                    &state.ctx.device,
                    state.ctx.target_format,
                    composer,
                ));
            }
        }
        match state.depth.as_mut() {
            Some(depth) => depth.resize(&state.ctx.device, width, height),
            None => state.depth = Some(DepthBuffer::new(&state.ctx.device, width, height)),
        }

        state.prepare(frame);
        let order = state.draw_order(frame);

        let (acquired, target_view) = match state.ctx.acquire() {
            Ok(pair) => pair,
            Err(SurfaceError::Timeout) => {
                tracing::warn!("surface timeout, skipping frame");
                self.frames_skipped += 1;
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "frame target unavailable");
                self.frames_skipped += 1;
                return;
            }
        };

        let (Some(bloom), Some(depth)) = (state.bloom.as_ref(), state.depth.as_ref()) else {
            return;
        };
        let mut encoder = state
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        state.encode_scene(&mut encoder, frame, &order, bloom.scene_view(), &depth.view);
        bloom.execute(&mut encoder, &target_view);
        state.ctx.queue.submit(std::iter::once(encoder.finish()));
        acquired.present();
        self.frames_presented += 1;
    }

    fn dispose(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        let live = state.objects.len();
        if live > 0 {
            tracing::warn!(live, "disposing with live objects");
        }
        for (_, object) in state.objects.drain() {
            object.destroy();
        }
        tracing::info!(frames = self.frames_presented, "wgpu backend disposed");
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::BloomPass;
    use crate::gpu::init_offscreen_context_blocking;
    use crate::material::{BasicMaterial, PointsMaterial};
    use crate::resources::GpuResources;

    /// Headless CI has no adapter; those runs skip.
    fn backend() -> Option<WgpuBackend> {
        init_offscreen_context_blocking(64, 48).ok().map(WgpuBackend::new)
    }

    #[test]
    fn test_objects_follow_ledger() {
        let Some(mut backend) = backend() else {
            return;
        };
        let mut gpu = GpuResources::new();
        let sphere = gpu.allocate_with(
            ResourceKind::Geometry,
            "glow",
            ResourceData::Mesh(MeshData::uv_sphere(1.45, 32, 32)),
        );
        gpu.allocate_with(
            ResourceKind::Material,
            "glow",
            ResourceData::Material(MaterialDesc::Basic(BasicMaterial {
                color: [0.5, 0.8, 1.0],
                blending: Blending::Additive,
            })),
        );
        gpu.sync_to(&mut backend);
        assert_eq!(backend.live_objects(), 2);

        gpu.release(sphere);
        gpu.sync_to(&mut backend);
        assert_eq!(backend.live_objects(), 1);

        gpu.release_all();
        gpu.sync_to(&mut backend);
        assert_eq!(backend.live_objects(), 0);
        backend.dispose();
        assert!(backend.is_disposed());
    }

    #[test]
    fn test_renders_points_offscreen() {
        let Some(mut backend) = backend() else {
            return;
        };
        let mut gpu = GpuResources::new();
        let points = vec![PointVertex::new(glam::Vec3::new(0.0, 4.0, 0.0), [1.0; 3])];
        let geometry = gpu.allocate_with(
            ResourceKind::Geometry,
            "stars",
            ResourceData::Points(points.clone()),
        );
        let material = gpu.allocate_with(
            ResourceKind::Material,
            "stars",
            ResourceData::Material(MaterialDesc::Points(PointsMaterial {
                size: 0.9,
                color: [1.0; 3],
                vertex_colors: true,
                blending: Blending::Normal,
            })),
        );
        gpu.sync_to(&mut backend);

        let composer = Composer::new(64, 48, 1.0, BloomPass::new(0.9, 0.6, 0.85, 64, 48));
        let frame = FrameSnapshot {
            camera: crate::camera::Camera::splash(64, 48).to_uniform(),
            points: vec![PointsDraw {
                name: "stars",
                geometry,
                material,
                count: 1,
                opacity: 0.9,
                vertices: Some(points),
            }],
            ..FrameSnapshot::default()
        };
        backend.render(&composer, &frame);
        assert_eq!(backend.frames_presented(), 1);
        assert_eq!(backend.frames_skipped(), 0);
    }

    #[test]
    fn test_malformed_texture_is_not_built() {
        let Some(mut backend) = backend() else {
            return;
        };
        let id = GpuResources::new().allocate(ResourceKind::Texture, "moon-map");
        backend.create(
            id,
            ResourceKind::Texture,
            &ResourceData::Texture {
                width: 2,
                height: 2,
                rgba: vec![255; 3],
            },
        );
        assert_eq!(backend.live_objects(), 0);
    }
}

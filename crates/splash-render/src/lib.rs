//! Rendering for the splash scene: camera and picking rays, meshes and
//! materials, a ledger of GPU-backed resources, the bloom composer, and the
//! wgpu backend frames are presented through.

pub mod backend;
pub mod bloom;
pub mod camera;
pub mod composer;
pub mod gpu;
pub mod material;
pub mod mesh;
pub mod pipelines;
pub mod ray;
pub mod resources;
pub mod wgpu_backend;

#[cfg(any(test, feature = "headless"))]
pub use backend::HeadlessBackend;
pub use backend::{FrameSnapshot, MeshDraw, PointsDraw, RenderBackend};
pub use bloom::{BLOOM_SHADER_SOURCE, BloomPipeline, HDR_FORMAT};
pub use camera::{Camera, CameraUniform};
pub use composer::{BLOOM_MIP_LEVELS, BloomParams, BloomPass, Composer, RenderPassKind};
pub use gpu::{
    RenderContext, RenderContextError, SurfaceError, init_offscreen_context_blocking,
    init_window_context_blocking,
};
pub use material::{
    BasicMaterial, Blending, EnvironmentUniform, MaterialDesc, MeshUniform, PointsMaterial,
    PointsUniform, ShaderMaterial, StandardMaterial, rgb_from_hex,
};
pub use mesh::{MeshData, MeshVertex, PointVertex};
pub use ray::{Ray, ray_sphere_intersect};
pub use resources::{GpuResources, ResourceData, ResourceId, ResourceKind};
pub use wgpu_backend::WgpuBackend;

//! Render backend seam.
//!
//! The scene hands a [`FrameSnapshot`] to a [`RenderBackend`] once per frame.
//! Draws refer to objects by [`ResourceId`]; the backend learns about them
//! through [`GpuResources::sync_to`](crate::GpuResources::sync_to) before the
//! frame that first uses them.

use glam::Mat4;

use crate::camera::CameraUniform;
use crate::composer::Composer;
use crate::material::EnvironmentUniform;
use crate::mesh::PointVertex;
use crate::resources::{ResourceData, ResourceId, ResourceKind};

/// Draw data for one mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDraw {
    /// Debug name.
    pub name: &'static str,
    pub geometry: ResourceId,
    pub material: ResourceId,
    /// Surface map bound to a standard material.
    pub texture: Option<ResourceId>,
    /// World transform.
    pub transform: Mat4,
    /// Material opacity.
    pub opacity: f32,
    /// Uniform block bytes for shader materials.
    pub uniforms: Option<Vec<u8>>,
}

/// Draw data for one point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsDraw {
    /// Debug name.
    pub name: &'static str,
    pub geometry: ResourceId,
    pub material: ResourceId,
    /// Number of points.
    pub count: usize,
    /// Material opacity.
    pub opacity: f32,
    /// This frame's points when the cloud moves. `None` keeps the uploaded ones.
    pub vertices: Option<Vec<PointVertex>>,
}

/// Everything the backend needs to composite one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSnapshot {
    /// Frame index since mount.
    pub frame: u64,
    /// Accumulated time in seconds.
    pub elapsed: f32,
    /// Aurora shader time uniform.
    pub aurora_time: f32,
    pub camera: CameraUniform,
    /// Lights and fog.
    pub environment: EnvironmentUniform,
    /// Meshes (bodies, glow, aurora).
    pub meshes: Vec<MeshDraw>,
    /// Point clouds (stars and explosion bursts).
    pub points: Vec<PointsDraw>,
}

/// Something that can present frames to a drawing surface.
pub trait RenderBackend {
    /// Resize the drawing surface in logical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Build the object behind a new ledger entry.
    fn create(&mut self, id: ResourceId, kind: ResourceKind, data: &ResourceData);

    /// Free the object behind a released ledger entry.
    fn destroy(&mut self, id: ResourceId);

    /// Composite and present one frame through the composer.
    fn render(&mut self, composer: &Composer, frame: &FrameSnapshot);

    /// Release the drawing context. Later calls are no-ops.
    fn dispose(&mut self);
}

/// Backend without a GPU: tracks objects, counts frames and keeps the last
/// snapshot.
#[cfg(any(test, feature = "headless"))]
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    size: (u32, u32),
    frames_presented: u64,
    last_frame: Option<FrameSnapshot>,
    objects: std::collections::BTreeMap<ResourceId, ResourceKind>,
    created: u64,
    destroyed: u64,
    unresolved_draws: u64,
    disposed: bool,
}

#[cfg(any(test, feature = "headless"))]
impl HeadlessBackend {
    /// Creates a backend with no size yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current surface size.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Frames presented so far.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Most recent frame.
    pub fn last_frame(&self) -> Option<&FrameSnapshot> {
        self.last_frame.as_ref()
    }

    /// Objects created and not yet destroyed.
    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    /// Whether the object behind `id` exists.
    pub fn has_object(&self, id: ResourceId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    /// Draws seen so far whose geometry or material did not exist.
    pub fn unresolved_draws(&self) -> u64 {
        self.unresolved_draws
    }

    /// Whether `dispose` has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(any(test, feature = "headless"))]
impl RenderBackend for HeadlessBackend {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn create(&mut self, id: ResourceId, kind: ResourceKind, _data: &ResourceData) {
        if self.objects.insert(id, kind).is_none() {
            self.created += 1;
        }
    }

    fn destroy(&mut self, id: ResourceId) {
        if self.objects.remove(&id).is_some() {
            self.destroyed += 1;
        } else {
            tracing::warn!(?id, "destroy of unknown object");
        }
    }

    fn render(&mut self, _composer: &Composer, frame: &FrameSnapshot) {
        if self.disposed {
            tracing::warn!(frame = frame.frame, "render after dispose ignored");
            return;
        }
        let meshes = frame.meshes.iter().map(|d| [d.geometry, d.material]);
        let points = frame.points.iter().map(|d| [d.geometry, d.material]);
        self.unresolved_draws += meshes
            .chain(points)
            .filter(|ids| !ids.iter().all(|id| self.objects.contains_key(id)))
            .count() as u64;
        self.frames_presented += 1;
        self.last_frame = Some(frame.clone());
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.last_frame = None;
            if !self.objects.is_empty() {
                tracing::warn!(live = self.objects.len(), "disposed with live objects");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::BloomPass;
    use crate::resources::GpuResources;

    fn composer() -> Composer {
        Composer::new(8, 8, 1.0, BloomPass::new(0.9, 0.6, 0.85, 8, 8))
    }

    #[test]
    fn test_headless_counts_frames() {
        let mut backend = HeadlessBackend::new();
        backend.set_size(800, 600);
        let frame = FrameSnapshot {
            frame: 3,
            ..FrameSnapshot::default()
        };
        backend.render(&composer(), &frame);
        backend.render(&composer(), &frame);
        assert_eq!(backend.frames_presented(), 2);
        assert_eq!(backend.size(), (800, 600));
        assert_eq!(backend.last_frame().map(|f| f.frame), Some(3));
    }

    #[test]
    fn test_render_after_dispose_is_ignored() {
        let mut backend = HeadlessBackend::new();
        backend.dispose();
        backend.render(&composer(), &FrameSnapshot::default());
        assert_eq!(backend.frames_presented(), 0);
        assert!(backend.is_disposed());
    }

    #[test]
    fn test_draw_of_unsynced_object_is_unresolved() {
        let mut gpu = GpuResources::new();
        let mut backend = HeadlessBackend::new();
        let geometry = gpu.allocate(ResourceKind::Geometry, "stars");
        let material = gpu.allocate(ResourceKind::Material, "stars");
        let frame = FrameSnapshot {
            points: vec![PointsDraw {
                name: "stars",
                geometry,
                material,
                count: 0,
                opacity: 0.9,
                vertices: None,
            }],
            ..FrameSnapshot::default()
        };
        backend.render(&composer(), &frame);
        assert_eq!(backend.unresolved_draws(), 1);

        gpu.sync_to(&mut backend);
        backend.render(&composer(), &frame);
        assert_eq!(backend.unresolved_draws(), 1);
        assert!(backend.has_object(geometry));
    }
}

//! Ledger of GPU-backed resources.
//!
//! Every geometry, material, texture, composer and renderer the scene
//! allocates gets a [`ResourceId`]. Allocations carry the data the backend
//! needs to build the real object; [`GpuResources::sync_to`] hands pending
//! creations and releases to a [`RenderBackend`]. Releasing an id twice is
//! refused and logged.

use std::collections::BTreeMap;

use crate::backend::RenderBackend;
use crate::material::MaterialDesc;
use crate::mesh::{MeshData, PointVertex};

/// What a GPU-backed allocation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Vertex/index buffers.
    Geometry,
    /// Shader program plus uniforms.
    Material,
    /// Texture image.
    Texture,
    /// Post-processing composer and its render targets.
    Composer,
    /// The renderer and its drawing context.
    Renderer,
}

/// Contents the backend builds a ledger entry's object from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
    /// Owned by the backend itself (renderer, composer).
    None,
    /// Point cloud, one vertex per point.
    Points(Vec<PointVertex>),
    /// Indexed triangle mesh.
    Mesh(MeshData),
    Material(MaterialDesc),
    /// Tightly packed RGBA8 pixels.
    Texture {
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
}

/// Handle to a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

/// Allocation ledger.
#[derive(Debug, Default)]
pub struct GpuResources {
    next_id: u64,
    live: BTreeMap<ResourceId, (ResourceKind, String)>,
    released: u64,
    to_create: Vec<(ResourceId, ResourceKind, ResourceData)>,
    to_destroy: Vec<ResourceId>,
}

impl GpuResources {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation the backend owns without extra data.
    pub fn allocate(&mut self, kind: ResourceKind, label: impl Into<String>) -> ResourceId {
        self.allocate_with(kind, label, ResourceData::None)
    }

    /// Record a new allocation and queue its data for the backend.
    pub fn allocate_with(
        &mut self,
        kind: ResourceKind,
        label: impl Into<String>,
        data: ResourceData,
    ) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        let label = label.into();
        tracing::trace!(?kind, %label, id = id.0, "gpu resource allocated");
        self.live.insert(id, (kind, label));
        self.to_create.push((id, kind, data));
        id
    }

    /// Release an allocation. Returns `false` if it was already released.
    pub fn release(&mut self, id: ResourceId) -> bool {
        match self.live.remove(&id) {
            Some((kind, label)) => {
                tracing::trace!(?kind, %label, id = id.0, "gpu resource released");
                self.released += 1;
                // Never reached the backend: drop the queued creation instead.
                let before = self.to_create.len();
                self.to_create.retain(|(pending, _, _)| *pending != id);
                if self.to_create.len() == before {
                    self.to_destroy.push(id);
                }
                true
            }
            None => {
                tracing::warn!(id = id.0, "gpu resource released twice");
                false
            }
        }
    }

    /// Release every remaining allocation, renderer last. Returns the count.
    pub fn release_all(&mut self) -> usize {
        let mut ids: Vec<_> = self
            .live
            .iter()
            .map(|(id, (kind, _))| (*kind == ResourceKind::Renderer, *id))
            .collect();
        ids.sort();
        let count = ids.len();
        for (_, id) in ids {
            self.release(id);
        }
        count
    }

    /// Apply queued releases, then queued creations, to `backend`. Returns
    /// how many objects were destroyed and created.
    pub fn sync_to<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> (usize, usize) {
        let destroyed = self.to_destroy.len();
        for id in self.to_destroy.drain(..) {
            backend.destroy(id);
        }
        let created = self.to_create.len();
        for (id, kind, data) in self.to_create.drain(..) {
            backend.create(id, kind, &data);
        }
        (destroyed, created)
    }

    /// Creations and releases not yet handed to a backend.
    pub fn pending(&self) -> usize {
        self.to_create.len() + self.to_destroy.len()
    }

    /// Whether an allocation is still alive.
    pub fn is_live(&self, id: ResourceId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of live allocations of one kind.
    pub fn live_count_of(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|(k, _)| *k == kind).count()
    }

    /// Total successful releases so far.
    pub fn released_count(&self) -> u64 {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn test_allocate_and_release() {
        let mut gpu = GpuResources::new();
        let geo = gpu.allocate(ResourceKind::Geometry, "stars");
        let mat = gpu.allocate(ResourceKind::Material, "stars");
        assert_ne!(geo, mat);
        assert_eq!(gpu.live_count(), 2);
        assert!(gpu.release(geo));
        assert!(!gpu.is_live(geo));
        assert_eq!(gpu.live_count_of(ResourceKind::Material), 1);
    }

    #[test]
    fn test_double_release_is_refused() {
        let mut gpu = GpuResources::new();
        let id = gpu.allocate(ResourceKind::Texture, "moon");
        assert!(gpu.release(id));
        assert!(!gpu.release(id));
        assert_eq!(gpu.released_count(), 1);
    }

    #[test]
    fn test_release_all_empties_ledger() {
        let mut gpu = GpuResources::new();
        gpu.allocate(ResourceKind::Renderer, "renderer");
        gpu.allocate(ResourceKind::Composer, "composer");
        gpu.allocate(ResourceKind::Geometry, "aurora");
        assert_eq!(gpu.release_all(), 3);
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.release_all(), 0);
        assert_eq!(gpu.released_count(), 3);
    }

    #[test]
    fn test_sync_creates_then_destroys_on_backend() {
        let mut gpu = GpuResources::new();
        let mut backend = HeadlessBackend::new();
        let stars = gpu.allocate_with(
            ResourceKind::Geometry,
            "stars",
            ResourceData::Points(vec![PointVertex::new(glam::Vec3::X, [1.0; 3])]),
        );
        gpu.allocate(ResourceKind::Renderer, "renderer");
        assert_eq!(gpu.sync_to(&mut backend), (0, 2));
        assert_eq!(backend.live_objects(), 2);

        gpu.release(stars);
        assert_eq!(gpu.pending(), 1);
        assert_eq!(gpu.sync_to(&mut backend), (1, 0));
        assert_eq!(backend.live_objects(), 1);
        assert_eq!(gpu.pending(), 0);
    }

    #[test]
    fn test_release_before_sync_never_reaches_backend() {
        let mut gpu = GpuResources::new();
        let mut backend = HeadlessBackend::new();
        let id = gpu.allocate(ResourceKind::Geometry, "explosion");
        gpu.release(id);
        assert_eq!(gpu.sync_to(&mut backend), (0, 0));
        assert_eq!(backend.created(), 0);
        assert_eq!(backend.destroyed(), 0);
    }
}

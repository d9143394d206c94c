//! Scene graph: built once per mount and then mutated in place every frame.
//!
//! The graph owns every mesh description and records the GPU allocations made
//! for them, so [`SceneGraph::dispose`] can release each exactly once.

use glam::{Mat4, Vec3};
use rand::Rng;
use splash_render::{
    EnvironmentUniform, GpuResources, MaterialDesc, MeshData, MeshDraw, PointsDraw, ResourceData,
    ResourceId, ResourceKind,
};

use crate::aurora::AuroraSurface;
use crate::celestial::{
    BodyId, BodyMaterial, CelestialBody, Glow, HoverState, OrbitPivot, PivotId,
    REDUCED_MOTION_SPIN_FACTOR,
};
use crate::color::rgb_from_hex;
use crate::environment::{Fog, Lighting, environment_uniform};
use crate::starfield::StarField;

/// Orbit step of pivot A in radians per frame.
pub const PIVOT_A_STEP: f32 = 0.0015;
/// Orbit step of pivot B in radians per frame.
pub const PIVOT_B_STEP: f32 = -0.0010;

/// Sphere tessellation for the bodies.
const BODY_SEGMENTS: u32 = 48;
/// Sphere tessellation for the moon halo.
const GLOW_SEGMENTS: u32 = 32;

/// Geometry and material ids of one drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Handles {
    geometry: ResourceId,
    material: ResourceId,
}

impl Handles {
    fn allocate(
        gpu: &mut GpuResources,
        label: &str,
        mesh: ResourceData,
        material: MaterialDesc,
    ) -> Self {
        Self {
            geometry: gpu.allocate_with(ResourceKind::Geometry, label, mesh),
            material: gpu.allocate_with(
                ResourceKind::Material,
                label,
                ResourceData::Material(material),
            ),
        }
    }

    fn ids(self) -> [ResourceId; 2] {
        [self.geometry, self.material]
    }
}

/// Inputs to [`SceneGraph::build`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    /// Number of stars to scatter.
    pub star_count: usize,
    /// Host requested reduced motion.
    pub reduced_motion: bool,
}

/// All scene contents.
#[derive(Debug)]
pub struct SceneGraph {
    /// Background stars.
    pub stars: StarField,
    /// Aurora ribbon behind the planets.
    pub aurora: AuroraSurface,
    /// Light rig.
    pub lighting: Lighting,
    /// Distance fog.
    pub fog: Fog,
    /// Halo around the moon.
    pub moon_glow: Glow,
    bodies: Vec<CelestialBody>,
    pivot_a: OrbitPivot,
    pivot_b: OrbitPivot,
    hover: HoverState,
    reduced_motion: bool,
    star_handles: Handles,
    aurora_handles: Handles,
    glow_handles: Handles,
    /// Parallel to `bodies`.
    body_handles: Vec<Handles>,
    maps: Vec<(BodyId, ResourceId)>,
    resources: Vec<ResourceId>,
}

impl SceneGraph {
    /// Build the scene, recording one geometry and one material per drawable.
    pub fn build(settings: SceneSettings, rng: &mut impl Rng, gpu: &mut GpuResources) -> Self {
        let stars = StarField::generate(rng, settings.star_count);
        let aurora = AuroraSurface::new(!settings.reduced_motion);

        let planet1 = CelestialBody::new(
            BodyId::Planet1,
            2.3,
            Vec3::new(8.0, 0.0, 0.0),
            Some(PivotId::A),
            0.005,
            BodyMaterial {
                color: rgb_from_hex(0x6ee7ff),
                emissive: rgb_from_hex(0x113355),
                emissive_intensity: 1.0,
                metalness: 0.3,
                roughness: 0.6,
                map: None,
            },
        );
        let planet2 = CelestialBody::new(
            BodyId::Planet2,
            1.6,
            Vec3::new(-6.0, 0.0, 0.0),
            Some(PivotId::B),
            0.007,
            BodyMaterial {
                color: rgb_from_hex(0xd946ef),
                emissive: rgb_from_hex(0x330a2b),
                emissive_intensity: 1.0,
                metalness: 0.4,
                roughness: 0.5,
                map: None,
            },
        );
        let moon = CelestialBody::new(
            BodyId::Moon,
            1.2,
            Vec3::new(1.0, 3.5, -6.0),
            None,
            0.003,
            BodyMaterial {
                color: rgb_from_hex(0xffffff),
                emissive: rgb_from_hex(0x111111),
                emissive_intensity: 0.4,
                metalness: 0.0,
                roughness: 1.0,
                map: None,
            },
        );

        let moon_glow = Glow {
            follows: BodyId::Moon,
            radius: 1.45,
            color: rgb_from_hex(0x88ccff),
            opacity: 0.25,
        };

        let star_handles = Handles::allocate(
            gpu,
            "stars",
            ResourceData::Points(stars.vertices()),
            MaterialDesc::Points(stars.material()),
        );
        let aurora_handles = Handles::allocate(
            gpu,
            "aurora",
            ResourceData::Mesh(aurora.mesh()),
            MaterialDesc::Shader(aurora.material()),
        );
        let bodies = vec![planet1, planet2, moon];
        let body_handles: Vec<Handles> = bodies
            .iter()
            .map(|b| {
                Handles::allocate(
                    gpu,
                    b.id.name(),
                    ResourceData::Mesh(MeshData::uv_sphere(
                        b.radius,
                        BODY_SEGMENTS,
                        BODY_SEGMENTS,
                    )),
                    MaterialDesc::Standard(b.material.standard()),
                )
            })
            .collect();
        let glow_handles = Handles::allocate(
            gpu,
            "moon-glow",
            ResourceData::Mesh(MeshData::uv_sphere(
                moon_glow.radius,
                GLOW_SEGMENTS,
                GLOW_SEGMENTS,
            )),
            MaterialDesc::Basic(moon_glow.material()),
        );

        let mut resources = Vec::new();
        resources.extend(star_handles.ids());
        resources.extend(aurora_handles.ids());
        resources.extend(body_handles.iter().flat_map(|h| h.ids()));
        resources.extend(glow_handles.ids());

        tracing::debug!(
            stars = stars.len(),
            reduced_motion = settings.reduced_motion,
            "scene graph built"
        );

        Self {
            stars,
            aurora,
            lighting: Lighting::default(),
            fog: Fog::default(),
            moon_glow,
            bodies,
            pivot_a: OrbitPivot::new(Vec3::new(0.0, 0.0, -10.0), PIVOT_A_STEP),
            pivot_b: OrbitPivot::new(Vec3::new(0.0, 0.0, -14.0), PIVOT_B_STEP),
            hover: HoverState::new(),
            reduced_motion: settings.reduced_motion,
            star_handles,
            aurora_handles,
            glow_handles,
            body_handles,
            maps: Vec::new(),
            resources,
        }
    }

    /// Whether the scene was built for reduced motion.
    pub fn is_reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// The interactive bodies.
    pub fn bodies(&self) -> &[CelestialBody] {
        &self.bodies
    }

    /// Look up a body.
    pub fn body(&self, id: BodyId) -> Option<&CelestialBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    /// Look up a pivot.
    pub fn pivot(&self, id: PivotId) -> &OrbitPivot {
        match id {
            PivotId::A => &self.pivot_a,
            PivotId::B => &self.pivot_b,
        }
    }

    /// Currently hovered body.
    pub fn hovered(&self) -> Option<BodyId> {
        self.hover.hovered()
    }

    fn parent_matrix(&self, body: &CelestialBody) -> Mat4 {
        body.pivot
            .map_or(Mat4::IDENTITY, |pivot| self.pivot(pivot).matrix())
    }

    /// World-space center of a body.
    pub fn body_center(&self, id: BodyId) -> Option<Vec3> {
        let body = self.body(id)?;
        Some(body.world_center(self.parent_matrix(body)))
    }

    /// `(id, world center, world radius)` for every pickable body.
    pub fn pick_spheres(&self) -> Vec<(BodyId, Vec3, f32)> {
        self.bodies
            .iter()
            .map(|b| (b.id, b.world_center(self.parent_matrix(b)), b.world_radius()))
            .collect()
    }

    /// Apply the star twinkle for the given elapsed time.
    pub fn twinkle(&mut self, elapsed: f32) {
        self.stars.update_twinkle(elapsed);
    }

    /// Advance both orbit pivots one frame. Frozen under reduced motion.
    pub fn advance_orbits(&mut self) {
        if self.reduced_motion {
            return;
        }
        self.pivot_a.advance();
        self.pivot_b.advance();
    }

    /// Advance every body's own rotation one frame.
    pub fn spin_bodies(&mut self) {
        let factor = if self.reduced_motion {
            REDUCED_MOTION_SPIN_FACTOR
        } else {
            1.0
        };
        for body in &mut self.bodies {
            body.spin(factor);
        }
    }

    /// Record this frame's hover hit and ease every body one step.
    ///
    /// Returns the previously hovered body when the hover changed.
    pub fn update_hover(&mut self, hit: Option<BodyId>) -> Option<Option<BodyId>> {
        self.hover.update(hit, self.bodies.iter_mut())
    }

    /// Set the aurora time uniform.
    pub fn set_aurora_time(&mut self, time: f32) {
        self.aurora.set_time(time);
    }

    /// Lights and fog as one uniform block.
    pub fn environment(&self) -> EnvironmentUniform {
        environment_uniform(&self.lighting, &self.fog)
    }

    /// Attach a loaded RGBA8 surface texture to a body, replacing any earlier one.
    pub fn attach_texture(
        &mut self,
        id: BodyId,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
        gpu: &mut GpuResources,
    ) {
        let Some(body) = self.bodies.iter_mut().find(|b| b.id == id) else {
            return;
        };
        body.material.map = Some((width, height));
        if let Some(pos) = self.maps.iter().position(|(body, _)| *body == id) {
            let (_, old) = self.maps.swap_remove(pos);
            self.resources.retain(|r| *r != old);
            gpu.release(old);
        }
        let texture = gpu.allocate_with(
            ResourceKind::Texture,
            format!("{}-map", id.name()),
            ResourceData::Texture { width, height, rgba },
        );
        self.maps.push((id, texture));
        self.resources.push(texture);
    }

    fn map_of(&self, id: BodyId) -> Option<ResourceId> {
        self.maps.iter().find(|(body, _)| *body == id).map(|(_, t)| *t)
    }

    /// Draw list for the meshes in the scene.
    pub fn mesh_draws(&self) -> Vec<MeshDraw> {
        let mut draws: Vec<MeshDraw> = self
            .bodies
            .iter()
            .zip(&self.body_handles)
            .map(|(b, h)| MeshDraw {
                name: b.id.name(),
                geometry: h.geometry,
                material: h.material,
                texture: self.map_of(b.id),
                transform: b.world_matrix(self.parent_matrix(b)),
                opacity: 1.0,
                uniforms: None,
            })
            .collect();
        if let Some(center) = self.body_center(self.moon_glow.follows) {
            draws.push(MeshDraw {
                name: "moon-glow",
                geometry: self.glow_handles.geometry,
                material: self.glow_handles.material,
                texture: None,
                transform: Mat4::from_translation(center),
                opacity: self.moon_glow.opacity,
                uniforms: None,
            });
        }
        draws.push(MeshDraw {
            name: "aurora",
            geometry: self.aurora_handles.geometry,
            material: self.aurora_handles.material,
            texture: None,
            transform: Mat4::from_translation(self.aurora.position),
            opacity: 1.0,
            uniforms: Some(bytemuck::bytes_of(&self.aurora.uniform()).to_vec()),
        });
        draws
    }

    /// Draw entry for the star field. Positions never change after upload.
    pub fn star_draw(&self) -> PointsDraw {
        PointsDraw {
            name: "stars",
            geometry: self.star_handles.geometry,
            material: self.star_handles.material,
            count: self.stars.len(),
            opacity: self.stars.opacity(),
            vertices: None,
        }
    }

    /// Release every GPU allocation the scene made. Returns how many were
    /// released; a second call releases nothing.
    pub fn dispose(&mut self, gpu: &mut GpuResources) -> usize {
        self.resources
            .drain(..)
            .filter(|id| gpu.release(*id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn build(reduced_motion: bool) -> (SceneGraph, GpuResources) {
        let mut gpu = GpuResources::new();
        let scene = SceneGraph::build(
            SceneSettings {
                star_count: 600,
                reduced_motion,
            },
            &mut ChaCha8Rng::seed_from_u64(9),
            &mut gpu,
        );
        (scene, gpu)
    }

    #[test]
    fn test_build_places_bodies() {
        let (scene, gpu) = build(false);
        assert_eq!(scene.stars.len(), 600);
        assert_eq!(scene.bodies().len(), 3);
        let p1 = scene.body_center(BodyId::Planet1).unwrap();
        let p2 = scene.body_center(BodyId::Planet2).unwrap();
        let moon = scene.body_center(BodyId::Moon).unwrap();
        assert!((p1 - Vec3::new(8.0, 0.0, -10.0)).length() < 1e-5);
        assert!((p2 - Vec3::new(-6.0, 0.0, -14.0)).length() < 1e-5);
        assert!((moon - Vec3::new(1.0, 3.5, -6.0)).length() < 1e-5);
        assert_eq!(gpu.live_count(), 12);
    }

    #[test]
    fn test_orbits_advance_in_opposite_directions() {
        let (mut scene, _gpu) = build(false);
        for _ in 0..100 {
            scene.advance_orbits();
        }
        assert!((scene.pivot(PivotId::A).angle - 0.15).abs() < 1e-4);
        assert!((scene.pivot(PivotId::B).angle + 0.10).abs() < 1e-4);
    }

    #[test]
    fn test_reduced_motion_freezes_orbits_and_slows_spin() {
        let (mut normal, _) = build(false);
        let (mut reduced, _) = build(true);
        for _ in 0..60 {
            normal.advance_orbits();
            normal.spin_bodies();
            reduced.advance_orbits();
            reduced.spin_bodies();
        }
        assert_eq!(reduced.pivot(PivotId::A).angle, 0.0);
        assert!(reduced.pivot(PivotId::A).angle <= normal.pivot(PivotId::A).angle);
        let n = normal.body(BodyId::Moon).unwrap().rotation();
        let r = reduced.body(BodyId::Moon).unwrap().rotation();
        assert!((r - n * 0.4).abs() < 1e-5);
        assert!(!reduced.aurora.is_animated());
    }

    #[test]
    fn test_pick_spheres_track_hover_scale() {
        let (mut scene, _gpu) = build(false);
        for _ in 0..100 {
            scene.update_hover(Some(BodyId::Planet2));
        }
        let (_, _, radius) = scene
            .pick_spheres()
            .into_iter()
            .find(|(id, _, _)| *id == BodyId::Planet2)
            .unwrap();
        assert!((radius - 1.6 * 1.2).abs() < 1e-3);
        assert_eq!(scene.hovered(), Some(BodyId::Planet2));
    }

    #[test]
    fn test_moon_glow_follows_moon() {
        let (scene, _gpu) = build(false);
        let draws = scene.mesh_draws();
        let glow = draws.iter().find(|d| d.name == "moon-glow").unwrap();
        let moon = draws.iter().find(|d| d.name == "moon").unwrap();
        assert_eq!(glow.transform.col(3), moon.transform.col(3));
        assert!((glow.opacity - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_attach_texture_records_allocation() {
        let (mut scene, mut gpu) = build(false);
        scene.attach_texture(BodyId::Moon, 2, 1, vec![255; 8], &mut gpu);
        scene.attach_texture(BodyId::Moon, 1024, 512, vec![255; 1024 * 512 * 4], &mut gpu);
        assert_eq!(scene.body(BodyId::Moon).unwrap().material.map, Some((1024, 512)));
        assert_eq!(gpu.live_count_of(ResourceKind::Texture), 1);
        let draws = scene.mesh_draws();
        let moon = draws.iter().find(|d| d.name == "moon").unwrap();
        assert!(moon.texture.is_some_and(|t| gpu.is_live(t)));
        assert_eq!(scene.dispose(&mut gpu), 13);
    }

    #[test]
    fn test_draws_reference_live_allocations() {
        let (scene, gpu) = build(false);
        let draws = scene.mesh_draws();
        assert_eq!(draws.len(), 5);
        for draw in &draws {
            assert!(gpu.is_live(draw.geometry), "{} geometry", draw.name);
            assert!(gpu.is_live(draw.material), "{} material", draw.name);
        }
        let aurora = draws.iter().find(|d| d.name == "aurora").unwrap();
        let bytes = aurora.uniforms.as_ref().unwrap();
        assert_eq!(bytes.len(), std::mem::size_of::<crate::AuroraUniform>());
        let stars = scene.star_draw();
        assert!(gpu.is_live(stars.geometry));
        assert_eq!(stars.count, 600);
    }

    #[test]
    fn test_whole_scene_renders_on_gpu() {
        use splash_render::{
            BloomPass, Camera, Composer, FrameSnapshot, RenderBackend, WgpuBackend,
            init_offscreen_context_blocking,
        };

        // Headless CI has no adapter; that run skips.
        let Ok(ctx) = init_offscreen_context_blocking(64, 48) else {
            return;
        };
        let mut backend = WgpuBackend::new(ctx);
        let (mut scene, mut gpu) = build(false);
        gpu.sync_to(&mut backend);
        assert_eq!(backend.live_objects(), 12);

        let composer = Composer::new(64, 48, 1.0, BloomPass::new(0.9, 0.6, 0.85, 64, 48));
        scene.set_aurora_time(1.5);
        let frame = FrameSnapshot {
            camera: Camera::splash(64, 48).to_uniform(),
            environment: scene.environment(),
            meshes: scene.mesh_draws(),
            points: vec![scene.star_draw()],
            ..FrameSnapshot::default()
        };
        backend.render(&composer, &frame);
        assert_eq!(backend.frames_presented(), 1);

        scene.dispose(&mut gpu);
        gpu.sync_to(&mut backend);
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_build_queues_mesh_and_material_data() {
        let (_scene, mut gpu) = build(false);
        let mut backend = splash_render::HeadlessBackend::new();
        assert_eq!(gpu.sync_to(&mut backend), (0, 12));
        assert_eq!(backend.live_objects(), 12);
    }

    #[test]
    fn test_dispose_releases_exactly_once() {
        let (mut scene, mut gpu) = build(false);
        assert_eq!(scene.dispose(&mut gpu), 12);
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(scene.dispose(&mut gpu), 0);
        assert_eq!(gpu.released_count(), 12);
    }
}

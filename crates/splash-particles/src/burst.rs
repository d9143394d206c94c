//! A single explosion burst.

use glam::Vec3;
use rand::Rng;
use splash_config::BurstMotion;
use splash_render::{
    Blending, GpuResources, MaterialDesc, PointVertex, PointsDraw, PointsMaterial, ResourceData,
    ResourceId, ResourceKind, rgb_from_hex,
};

/// Points per burst.
pub const BURST_POINTS: usize = 100;
/// Velocity multiplier applied on every advance.
pub const BURST_SPEED: f32 = 1.2;
/// Life lost per second.
pub const BURST_DECAY: f32 = 0.8;
/// Point color (0xRRGGBB).
pub const BURST_COLOR: u32 = 0xffbbff;
/// Point size.
pub const BURST_POINT_SIZE: f32 = 0.15;

/// Additive, uniformly colored point material shared by every burst.
pub fn burst_material() -> PointsMaterial {
    PointsMaterial {
        size: BURST_POINT_SIZE,
        color: rgb_from_hex(BURST_COLOR),
        vertex_colors: false,
        blending: Blending::Additive,
    }
}

/// Frame time the `TimeScaled` motion is normalized against.
const REFERENCE_FPS: f32 = 60.0;

/// One point's velocity: a direction drawn uniformly from the cube
/// `[-0.5, 0.5)³` and normalized, scaled by a magnitude in `[0.2, 0.6)`.
///
/// Cube sampling leans toward the corners; a zero direction stays zero.
pub fn sample_velocity(rng: &mut impl Rng) -> Vec3 {
    let direction = Vec3::new(
        rng.random::<f32>() - 0.5,
        rng.random::<f32>() - 0.5,
        rng.random::<f32>() - 0.5,
    )
    .normalize_or_zero();
    direction * (rng.random::<f32>() * 0.4 + 0.2)
}

/// Points flying out from an origin, fading with their remaining life.
#[derive(Debug)]
pub struct ExplosionBurst {
    origin: Vec3,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    life: f32,
    geometry: ResourceId,
    material: ResourceId,
}

impl ExplosionBurst {
    /// Create a burst of [`BURST_POINTS`] points at `origin` with full life.
    pub fn new(origin: Vec3, rng: &mut impl Rng, gpu: &mut GpuResources) -> Self {
        let velocities = (0..BURST_POINTS).map(|_| sample_velocity(rng)).collect();
        let positions = vec![origin; BURST_POINTS];
        let geometry = gpu.allocate_with(
            ResourceKind::Geometry,
            "explosion",
            ResourceData::Points(point_vertices(&positions)),
        );
        let material = gpu.allocate_with(
            ResourceKind::Material,
            "explosion",
            ResourceData::Material(MaterialDesc::Points(burst_material())),
        );
        Self {
            origin,
            positions,
            velocities,
            life: 1.0,
            geometry,
            material,
        }
    }

    /// Where the burst was spawned.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Current point positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Per-point velocities, parallel to [`positions`](Self::positions).
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Remaining life; starts at 1.
    pub fn life(&self) -> f32 {
        self.life
    }

    /// Material opacity, `max(0, life)`.
    pub fn opacity(&self) -> f32 {
        self.life.max(0.0)
    }

    /// Whether the burst still has life left.
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// Advance one frame of `dt` seconds. Returns whether the burst is alive.
    pub fn advance(&mut self, dt: f32, motion: BurstMotion) -> bool {
        let step = match motion {
            BurstMotion::PerFrame => BURST_SPEED,
            BurstMotion::TimeScaled => BURST_SPEED * dt * REFERENCE_FPS,
        };
        for (p, v) in self.positions.iter_mut().zip(&self.velocities) {
            *p += *v * step;
        }
        self.life -= dt * BURST_DECAY;
        self.is_alive()
    }

    /// Draw entry carrying this frame's positions.
    pub fn draw(&self) -> PointsDraw {
        PointsDraw {
            name: "explosion",
            geometry: self.geometry,
            material: self.material,
            count: self.positions.len(),
            opacity: self.opacity(),
            vertices: Some(point_vertices(&self.positions)),
        }
    }

    /// Release the burst's GPU allocations.
    pub fn release(self, gpu: &mut GpuResources) {
        gpu.release(self.geometry);
        gpu.release(self.material);
    }
}

fn point_vertices(positions: &[Vec3]) -> Vec<PointVertex> {
    // Color comes from the material.
    positions
        .iter()
        .map(|p| PointVertex::new(*p, [1.0; 3]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn burst(seed: u64) -> (ExplosionBurst, GpuResources) {
        let mut gpu = GpuResources::new();
        let burst = ExplosionBurst::new(
            Vec3::new(8.0, 0.0, -10.0),
            &mut ChaCha8Rng::seed_from_u64(seed),
            &mut gpu,
        );
        (burst, gpu)
    }

    #[test]
    fn test_new_burst_starts_at_origin() {
        let (burst, gpu) = burst(1);
        assert_eq!(burst.positions().len(), BURST_POINTS);
        assert_eq!(burst.velocities().len(), BURST_POINTS);
        assert!(burst.positions().iter().all(|p| *p == burst.origin()));
        assert_eq!(burst.life(), 1.0);
        assert_eq!(burst.opacity(), 1.0);
        assert_eq!(gpu.live_count(), 2);
    }

    #[test]
    fn test_velocity_magnitude_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for i in 0..5000 {
            let speed = sample_velocity(&mut rng).length();
            assert!(
                (0.2 - 1e-5..0.6 + 1e-5).contains(&speed),
                "Velocity {i} has magnitude {speed}"
            );
        }
    }

    #[test]
    fn test_per_frame_motion_ignores_dt() {
        let (mut a, _) = burst(2);
        let (mut b, _) = burst(2);
        a.advance(0.016, BurstMotion::PerFrame);
        b.advance(0.033, BurstMotion::PerFrame);
        assert_eq!(a.positions(), b.positions());
        let expected = a.origin() + a.velocities()[0] * BURST_SPEED;
        assert!((a.positions()[0] - expected).length() < 1e-5);
    }

    #[test]
    fn test_time_scaled_motion_matches_per_frame_at_60hz() {
        let (mut a, _) = burst(3);
        let (mut b, _) = burst(3);
        a.advance(1.0 / 60.0, BurstMotion::PerFrame);
        b.advance(1.0 / 60.0, BurstMotion::TimeScaled);
        for (pa, pb) in a.positions().iter().zip(b.positions()) {
            assert!((*pa - *pb).length() < 1e-5);
        }
    }

    #[test]
    fn test_life_decays_and_opacity_clamps() {
        let (mut burst, _) = burst(4);
        assert!(burst.advance(0.5, BurstMotion::PerFrame));
        assert!((burst.life() - 0.6).abs() < 1e-6);
        assert!((burst.opacity() - 0.6).abs() < 1e-6);
        assert!(!burst.advance(1.0, BurstMotion::PerFrame));
        assert!(burst.life() < 0.0);
        assert_eq!(burst.opacity(), 0.0);
    }

    #[test]
    fn test_draw_follows_positions() {
        let (mut burst, gpu) = burst(7);
        burst.advance(1.0 / 60.0, BurstMotion::PerFrame);
        let draw = burst.draw();
        assert!(gpu.is_live(draw.geometry) && gpu.is_live(draw.material));
        let vertices = draw.vertices.unwrap();
        assert_eq!(vertices.len(), BURST_POINTS);
        assert_eq!(vertices[3].position, burst.positions()[3].to_array());
    }

    #[test]
    fn test_material_is_additive_pink() {
        let m = burst_material();
        assert_eq!(m.blending, Blending::Additive);
        assert!(!m.vertex_colors);
        assert!((m.size - 0.15).abs() < f32::EPSILON);
        assert_eq!(m.color, rgb_from_hex(0xffbbff));
    }

    #[test]
    fn test_release_frees_allocations() {
        let (burst, mut gpu) = burst(6);
        burst.release(&mut gpu);
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.released_count(), 2);
    }
}

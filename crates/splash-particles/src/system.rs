//! The set of live bursts.

use glam::Vec3;
use rand::Rng;
use splash_config::BurstMotion;
use splash_render::{GpuResources, PointsDraw};
use tracing::{debug, trace};

use crate::burst::ExplosionBurst;

/// Live explosion bursts. Bursts are independent of one another.
#[derive(Debug, Default)]
pub struct ExplosionSystem {
    bursts: Vec<ExplosionBurst>,
    motion: BurstMotion,
    spawned: u64,
    expired: u64,
}

impl ExplosionSystem {
    /// An empty system advancing bursts with `motion`.
    pub fn new(motion: BurstMotion) -> Self {
        Self {
            motion,
            ..Self::default()
        }
    }

    /// Spawn a burst at `origin`.
    pub fn spawn(&mut self, origin: Vec3, rng: &mut impl Rng, gpu: &mut GpuResources) {
        self.bursts.push(ExplosionBurst::new(origin, rng, gpu));
        self.spawned += 1;
        trace!(?origin, live = self.bursts.len(), "explosion spawned");
    }

    /// Advance every burst by `dt` seconds. Bursts whose life reached zero are
    /// removed and released on this tick. Returns how many expired.
    pub fn tick(&mut self, dt: f32, gpu: &mut GpuResources) -> usize {
        let motion = self.motion;
        let before = self.bursts.len();
        let mut live = Vec::with_capacity(before);
        for mut burst in self.bursts.drain(..) {
            if burst.advance(dt, motion) {
                live.push(burst);
            } else {
                burst.release(gpu);
            }
        }
        self.bursts = live;
        let expired = before - self.bursts.len();
        if expired > 0 {
            self.expired += expired as u64;
            debug!(expired, live = self.bursts.len(), "explosions expired");
        }
        expired
    }

    /// Live bursts in spawn order.
    pub fn bursts(&self) -> &[ExplosionBurst] {
        &self.bursts
    }

    /// Number of live bursts.
    pub fn len(&self) -> usize {
        self.bursts.len()
    }

    /// Whether no bursts are live.
    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty()
    }

    /// Bursts spawned since creation.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Bursts expired since creation.
    pub fn expired(&self) -> u64 {
        self.expired
    }

    /// Motion mode in use.
    pub fn motion(&self) -> BurstMotion {
        self.motion
    }

    /// One draw entry per live burst.
    pub fn draws(&self) -> Vec<PointsDraw> {
        self.bursts
            .iter()
            .map(ExplosionBurst::draw)
            .collect()
    }

    /// Release every live burst. Returns how many were dropped.
    pub fn clear(&mut self, gpu: &mut GpuResources) -> usize {
        let count = self.bursts.len();
        for burst in self.bursts.drain(..) {
            burst.release(gpu);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burst::BURST_POINTS;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_spawn_adds_one_burst_of_fixed_size() {
        let mut gpu = GpuResources::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut system = ExplosionSystem::new(BurstMotion::PerFrame);
        system.spawn(Vec3::ZERO, &mut rng, &mut gpu);
        assert_eq!(system.len(), 1);
        assert_eq!(system.bursts()[0].positions().len(), BURST_POINTS);
        assert_eq!(system.draws()[0].count, BURST_POINTS);
    }

    #[test]
    fn test_burst_removed_on_the_tick_it_expires() {
        let mut gpu = GpuResources::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut system = ExplosionSystem::new(BurstMotion::PerFrame);
        system.spawn(Vec3::ONE, &mut rng, &mut gpu);
        let mut ticks = 0;
        while !system.is_empty() {
            system.tick(DT, &mut gpu);
            ticks += 1;
            assert!(
                system.bursts().iter().all(|b| b.life() > 0.0),
                "burst with non-positive life left alive after tick {ticks}"
            );
            assert!(ticks < 1000, "burst never expired");
        }
        // 1 / (0.8 / 60) = 75 frames.
        assert!((75..=76).contains(&ticks), "expired after {ticks} ticks");
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(system.expired(), 1);
    }

    #[test]
    fn test_bursts_are_independent() {
        let mut gpu = GpuResources::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut system = ExplosionSystem::new(BurstMotion::PerFrame);
        system.spawn(Vec3::ZERO, &mut rng, &mut gpu);
        for _ in 0..40 {
            system.tick(DT, &mut gpu);
        }
        system.spawn(Vec3::X, &mut rng, &mut gpu);
        assert_eq!(system.len(), 2);
        for _ in 0..40 {
            system.tick(DT, &mut gpu);
        }
        assert_eq!(system.len(), 1);
        assert_eq!(system.bursts()[0].origin(), Vec3::X);
        assert_eq!(gpu.live_count(), 2);
    }

    #[test]
    fn test_opacity_tracks_life() {
        let mut gpu = GpuResources::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut system = ExplosionSystem::new(BurstMotion::TimeScaled);
        system.spawn(Vec3::ZERO, &mut rng, &mut gpu);
        system.tick(0.25, &mut gpu);
        assert!((system.draws()[0].opacity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut gpu = GpuResources::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut system = ExplosionSystem::new(BurstMotion::PerFrame);
        for _ in 0..3 {
            system.spawn(Vec3::ZERO, &mut rng, &mut gpu);
        }
        assert_eq!(system.clear(&mut gpu), 3);
        assert!(system.is_empty());
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(system.spawned(), 3);
    }
}

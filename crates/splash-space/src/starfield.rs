//! Star field: a point cloud filling a spherical shell around the camera,
//! tinted pastel blue, with a global twinkle on its opacity.

use glam::Vec3;
use rand::Rng;
use splash_render::{Blending, PointVertex, PointsMaterial};

use crate::color::hsl_to_rgb;

/// Inner radius of the star shell.
pub const STAR_MIN_RADIUS: f32 = 20.0;
/// Outer radius of the star shell (exclusive).
pub const STAR_MAX_RADIUS: f32 = 200.0;
/// Largest radius a star is placed at.
const STAR_RADIUS_CEIL: f32 = f32::from_bits(STAR_MAX_RADIUS.to_bits() - 1);
/// Point size of a star.
pub const STAR_SIZE: f32 = 0.9;
/// Opacity before the first twinkle update.
pub const STAR_INITIAL_OPACITY: f32 = 0.9;

/// Star opacity at the given elapsed time: `0.85 + sin(1.5 t) * 0.1`.
///
/// Always within `[0.75, 0.95]`.
pub fn twinkle_opacity(elapsed: f32) -> f32 {
    0.85 + (elapsed * 1.5).sin() * 0.1
}

/// Radius in the shell for a uniform sample `u` in `[0, 1)`.
///
/// Rounding can carry `20 + u * 180` up to 200 for `u` just below one, so the
/// result is clamped under the outer radius.
pub fn shell_radius(u: f32) -> f32 {
    (STAR_MIN_RADIUS + u * (STAR_MAX_RADIUS - STAR_MIN_RADIUS)).min(STAR_RADIUS_CEIL)
}

/// Immutable star positions and colors plus the animated opacity.
#[derive(Debug, Clone)]
pub struct StarField {
    positions: Vec<Vec3>,
    colors: Vec<[f32; 3]>,
    opacity: f32,
}

impl StarField {
    /// Scatter `count` stars through the shell `[20, 200)`.
    ///
    /// Directions use inverse-CDF sampling (`phi = acos(2u - 1)`) so they are
    /// uniform over the sphere with no clustering at the poles.
    pub fn generate(rng: &mut impl Rng, count: usize) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);

        for _ in 0..count {
            let r = shell_radius(rng.random::<f32>());
            let theta = rng.random::<f32>() * std::f32::consts::TAU;
            let phi = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();

            positions.push(Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin(),
                r * phi.cos(),
            ));

            let hue = 0.6 + rng.random::<f32>() * 0.2;
            let lightness = 0.7 + rng.random::<f32>() * 0.3;
            colors.push(hsl_to_rgb(hue, 0.6, lightness));
        }

        Self {
            positions,
            colors,
            opacity: STAR_INITIAL_OPACITY,
        }
    }

    /// Apply the twinkle for the given elapsed time.
    pub fn update_twinkle(&mut self, elapsed: f32) {
        self.opacity = twinkle_opacity(elapsed);
    }

    /// Current material opacity.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Star positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Star colors, parallel to [`positions`](Self::positions).
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Number of stars.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the field has no stars.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleaved vertices for upload.
    pub fn vertices(&self) -> Vec<PointVertex> {
        self.positions
            .iter()
            .zip(&self.colors)
            .map(|(p, c)| PointVertex::new(*p, *c))
            .collect()
    }

    /// Point material: vertex-colored sprites of [`STAR_SIZE`].
    pub fn material(&self) -> PointsMaterial {
        PointsMaterial {
            size: STAR_SIZE,
            color: [1.0; 3],
            vertex_colors: true,
            blending: Blending::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn field(seed: u64, count: usize) -> StarField {
        StarField::generate(&mut ChaCha8Rng::seed_from_u64(seed), count)
    }

    #[test]
    fn test_star_count_matches_request() {
        assert_eq!(field(42, 1500).len(), 1500);
        assert_eq!(field(42, 600).len(), 600);
        assert!(field(42, 0).is_empty());
    }

    #[test]
    fn test_star_radius_within_shell() {
        let stars = field(42, 5000);
        for (i, p) in stars.positions().iter().enumerate() {
            let r = p.length();
            assert!(
                (STAR_MIN_RADIUS - 1e-3..STAR_MAX_RADIUS).contains(&r),
                "Star {i} at radius {r} outside [20, 200)"
            );
        }
    }

    #[test]
    fn test_star_distribution_covers_full_sky() {
        let stars = field(42, 8000);
        let mut octant_counts = [0u32; 8];
        for p in stars.positions() {
            let octant = ((p.x >= 0.0) as usize)
                | (((p.y >= 0.0) as usize) << 1)
                | (((p.z >= 0.0) as usize) << 2);
            octant_counts[octant] += 1;
        }
        for (i, &count) in octant_counts.iter().enumerate() {
            assert!(
                (700..=1300).contains(&count),
                "Octant {i} has {count} stars, expected roughly 1000"
            );
        }
    }

    #[test]
    fn test_no_polar_clustering() {
        // Uniform on the sphere means cos(phi) = z/r is uniform in [-1, 1].
        let stars = field(7, 10_000);
        let polar = stars
            .positions()
            .iter()
            .filter(|p| (p.z / p.length()).abs() > 0.9)
            .count();
        // Expected fraction is 10%.
        assert!(
            (800..=1200).contains(&polar),
            "{polar} of 10000 stars within the polar caps, expected ~1000"
        );
    }

    #[test]
    fn test_star_colors_are_pastel_blue() {
        let stars = field(42, 2000);
        for (i, c) in stars.colors().iter().enumerate() {
            assert!(c.iter().all(|v| (0.0..=1.0).contains(v)), "Star {i} color {c:?}");
            assert!(c[2] >= c[1] - 1e-4, "Star {i} is not blue-dominant: {c:?}");
            let max = c.iter().copied().fold(0.0f32, f32::max);
            assert!(max >= 0.7 - 1e-4, "Star {i} is too dark: {c:?}");
        }
    }

    #[test]
    fn test_same_seed_produces_same_field() {
        let a = field(123, 500);
        let b = field(123, 500);
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.colors(), b.colors());
    }

    #[test]
    fn test_twinkle_is_bounded() {
        let mut t = 0.0f32;
        while t < 100.0 {
            let o = twinkle_opacity(t);
            assert!((0.75 - 1e-6..=0.95 + 1e-6).contains(&o), "opacity {o} at t={t}");
            t += 0.013;
        }
        assert!((twinkle_opacity(0.0) - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_update_twinkle_sets_opacity() {
        let mut stars = field(1, 10);
        assert!((stars.opacity() - STAR_INITIAL_OPACITY).abs() < f32::EPSILON);
        stars.update_twinkle(std::f32::consts::PI / 3.0);
        assert!((stars.opacity() - 0.95).abs() < 1e-5);
    }

    #[test]
    fn test_vertices_interleave_positions_and_colors() {
        let stars = field(3, 16);
        let vertices = stars.vertices();
        assert_eq!(vertices.len(), 16);
        assert_eq!(vertices[5].position, stars.positions()[5].to_array());
        assert_eq!(vertices[5].color, stars.colors()[5]);
        let material = stars.material();
        assert_eq!(material.size, STAR_SIZE);
        assert!(material.vertex_colors);
    }

    #[test]
    fn test_radius_stays_below_outer_shell_at_top_of_range() {
        let below_one = 1.0f32 - f32::EPSILON / 2.0;
        assert!(shell_radius(below_one) < STAR_MAX_RADIUS);
        assert!(shell_radius(1.0) < STAR_MAX_RADIUS);
        assert_eq!(shell_radius(0.0), STAR_MIN_RADIUS);
    }
}

//! Rays and ray/sphere intersection for pointer picking.

use glam::Vec3;

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction (zero if constructed from a zero vector).
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray; the direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance to the first front-facing hit on a sphere, if any.
    ///
    /// A ray starting inside the sphere reports the exit point.
    pub fn hit_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let (t_near, t_far) = ray_sphere_intersect(self.origin, self.direction, center, radius)?;
        if t_near >= 0.0 {
            Some(t_near)
        } else if t_far >= 0.0 {
            Some(t_far)
        } else {
            None
        }
    }
}

/// Ray-sphere intersection returning `(t_near, t_far)`, or `None` on miss.
///
/// `dir` must be unit length.
pub fn ray_sphere_intersect(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<(f32, f32)> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 || !disc.is_finite() {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    Some((-b - sqrt_disc, -b + sqrt_disc))
}

//! Pointer ray picking against the interactive bodies.

use glam::{Vec2, Vec3};
use splash_render::{Camera, Ray};
use splash_space::{BodyId, SceneGraph};

/// Nearest body under a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Body that was hit.
    pub body: BodyId,
    /// World-space hit point on the body's surface.
    pub point: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
}

/// Nearest hit among `(id, center, radius)` spheres. Empty input is a miss.
pub fn pick_nearest(ray: &Ray, spheres: &[(BodyId, Vec3, f32)]) -> Option<PickHit> {
    spheres
        .iter()
        .filter_map(|&(body, center, radius)| {
            ray.hit_sphere(center, radius).map(|distance| PickHit {
                body,
                point: ray.at(distance),
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Cast from the camera through `ndc` into the scene. A scene that is not
/// built yet never reports a hit.
pub fn pick(camera: &Camera, ndc: Vec2, scene: Option<&SceneGraph>) -> Option<PickHit> {
    let scene = scene?;
    pick_nearest(&camera.ray_from_ndc(ndc), &scene.pick_spheres())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_of_overlapping_spheres_wins() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let spheres = [
            (BodyId::Planet2, Vec3::new(0.0, 0.0, -20.0), 1.0),
            (BodyId::Planet1, Vec3::new(0.0, 0.0, -10.0), 1.0),
        ];
        let hit = pick_nearest(&ray, &spheres).unwrap();
        assert_eq!(hit.body, BodyId::Planet1);
        assert!((hit.distance - 9.0).abs() < 1e-5);
        assert!((hit.point - Vec3::new(0.0, 0.0, -9.0)).length() < 1e-5);
    }

    #[test]
    fn test_miss_and_empty_return_none() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(pick_nearest(&ray, &[]).is_none());
        let spheres = [(BodyId::Moon, Vec3::new(5.0, 0.0, -10.0), 1.0)];
        assert!(pick_nearest(&ray, &spheres).is_none());
    }

    #[test]
    fn test_spheres_behind_the_camera_are_ignored() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let spheres = [(BodyId::Moon, Vec3::new(0.0, 0.0, 10.0), 1.0)];
        assert!(pick_nearest(&ray, &spheres).is_none());
    }

    #[test]
    fn test_unbuilt_scene_is_a_miss() {
        let camera = Camera::splash(800, 600);
        assert!(pick(&camera, Vec2::ZERO, None).is_none());
    }
}

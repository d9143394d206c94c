//! Orbiting planets and the moon: transforms, own rotation, and the hover
//! state machine that eases scale and spin toward their targets.

use glam::{Mat4, Quat, Vec3};
use splash_render::{BasicMaterial, Blending, StandardMaterial};

/// Hovered bodies grow to this multiple of their base scale.
pub const HOVER_SCALE: f32 = 1.2;
/// Own-rotation speed (radians per frame) a hovered body spins up to.
pub const HOVER_ROTATION_SPEED: f32 = 0.02;
/// Per-frame easing factor for scale and spin.
pub const HOVER_EASE: f32 = 0.2;
/// Own-rotation multiplier under reduced motion.
pub const REDUCED_MOTION_SPIN_FACTOR: f32 = 0.4;

/// Interactive bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyId {
    /// Large cyan planet on the near orbit.
    Planet1,
    /// Small magenta planet on the far orbit.
    Planet2,
    /// Textured moon, not on an orbit.
    Moon,
}

impl BodyId {
    /// All bodies, in pick order.
    pub const ALL: [BodyId; 3] = [BodyId::Planet1, BodyId::Planet2, BodyId::Moon];

    /// Debug name.
    pub fn name(self) -> &'static str {
        match self {
            BodyId::Planet1 => "planet1",
            BodyId::Planet2 => "planet2",
            BodyId::Moon => "moon",
        }
    }
}

/// Orbit pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotId {
    /// Carries Planet1.
    A,
    /// Carries Planet2.
    B,
}

/// A point that rotates about its own Y axis, carrying a body with it.
#[derive(Debug, Clone)]
pub struct OrbitPivot {
    /// Pivot position in world space.
    pub position: Vec3,
    /// Current rotation about Y in radians.
    pub angle: f32,
    /// Rotation added per frame.
    pub step: f32,
}

impl OrbitPivot {
    /// Pivot at `position` advancing by `step` radians per frame.
    pub fn new(position: Vec3, step: f32) -> Self {
        Self {
            position,
            angle: 0.0,
            step,
        }
    }

    /// Advance one frame.
    pub fn advance(&mut self) {
        self.angle += self.step;
    }

    /// Pivot-to-world transform.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_y(self.angle), self.position)
    }
}

/// Standard-material parameters for a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyMaterial {
    /// Base color (white when textured).
    pub color: [f32; 3],
    /// Emissive color.
    pub emissive: [f32; 3],
    /// Emissive multiplier.
    pub emissive_intensity: f32,
    /// Metalness.
    pub metalness: f32,
    /// Roughness.
    pub roughness: f32,
    /// Surface texture size, once one has loaded.
    pub map: Option<(u32, u32)>,
}

impl BodyMaterial {
    /// Material description for upload.
    pub fn standard(&self) -> StandardMaterial {
        StandardMaterial {
            color: self.color,
            emissive: self.emissive,
            emissive_intensity: self.emissive_intensity,
            metalness: self.metalness,
            roughness: self.roughness,
        }
    }
}

/// A pickable sphere with eased hover scale and spin.
#[derive(Debug, Clone)]
pub struct CelestialBody {
    /// Which body this is.
    pub id: BodyId,
    /// Sphere radius at scale 1.
    pub radius: f32,
    /// Position relative to its pivot (or world when unparented).
    pub local_position: Vec3,
    /// Orbit pivot carrying the body.
    pub pivot: Option<PivotId>,
    /// Surface material.
    pub material: BodyMaterial,
    base_scale: f32,
    scale: f32,
    base_rotation_speed: f32,
    rotation_speed: f32,
    rotation: f32,
}

impl CelestialBody {
    /// A body at rest with scale 1 spinning at `base_rotation_speed`.
    pub fn new(
        id: BodyId,
        radius: f32,
        local_position: Vec3,
        pivot: Option<PivotId>,
        base_rotation_speed: f32,
        material: BodyMaterial,
    ) -> Self {
        Self {
            id,
            radius,
            local_position,
            pivot,
            material,
            base_scale: 1.0,
            scale: 1.0,
            base_rotation_speed,
            rotation_speed: base_rotation_speed,
            rotation: 0.0,
        }
    }

    /// Current uniform scale.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Scale at rest.
    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    /// Current own-rotation speed in radians per frame.
    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    /// Own-rotation speed at rest.
    pub fn base_rotation_speed(&self) -> f32 {
        self.base_rotation_speed
    }

    /// Current own rotation about Y.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Advance the own rotation by the current speed times `factor`.
    pub fn spin(&mut self, factor: f32) {
        self.rotation += self.rotation_speed * factor;
    }

    /// Ease scale and spin one frame toward the hovered or resting targets.
    pub fn ease_hover(&mut self, hovered: bool) {
        let (scale_target, speed_target) = if hovered {
            (self.base_scale * HOVER_SCALE, HOVER_ROTATION_SPEED)
        } else {
            (self.base_scale, self.base_rotation_speed)
        };
        self.scale = ease_toward(self.scale, scale_target, HOVER_EASE);
        self.rotation_speed = ease_toward(self.rotation_speed, speed_target, HOVER_EASE);
    }

    /// World transform given its parent's transform.
    pub fn world_matrix(&self, parent: Mat4) -> Mat4 {
        parent
            * Mat4::from_scale_rotation_translation(
                Vec3::splat(self.scale),
                Quat::from_rotation_y(self.rotation),
                self.local_position,
            )
    }

    /// World-space center given its parent's transform.
    pub fn world_center(&self, parent: Mat4) -> Vec3 {
        parent.transform_point3(self.local_position)
    }

    /// Radius after scaling.
    pub fn world_radius(&self) -> f32 {
        self.radius * self.scale
    }
}

/// Additive halo that follows a body without being pickable.
#[derive(Debug, Clone)]
pub struct Glow {
    /// Body the halo is centered on.
    pub follows: BodyId,
    /// Halo radius.
    pub radius: f32,
    /// Halo color.
    pub color: [f32; 3],
    /// Halo opacity.
    pub opacity: f32,
}

impl Glow {
    /// Unlit, additively blended halo material.
    pub fn material(&self) -> BasicMaterial {
        BasicMaterial {
            color: self.color,
            blending: Blending::Additive,
        }
    }
}

/// `value += (target - value) * factor`.
pub fn ease_toward(value: f32, target: f32, factor: f32) -> f32 {
    value + (target - value) * factor
}

/// Which body, if any, the pointer is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState {
    hovered: Option<BodyId>,
}

impl HoverState {
    /// No body hovered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently hovered body.
    pub fn hovered(&self) -> Option<BodyId> {
        self.hovered
    }

    /// Record this frame's hit and ease every body one step.
    ///
    /// The hovered body eases toward its hover targets; all others ease back to
    /// rest. Returns the previous hovered body when the hover changed.
    pub fn update<'a>(
        &mut self,
        hit: Option<BodyId>,
        bodies: impl IntoIterator<Item = &'a mut CelestialBody>,
    ) -> Option<Option<BodyId>> {
        let previous = self.hovered;
        self.hovered = hit;
        for body in bodies {
            body.ease_hover(Some(body.id) == hit);
        }
        (previous != hit).then_some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> BodyMaterial {
        BodyMaterial {
            color: [1.0; 3],
            emissive: [0.0; 3],
            emissive_intensity: 1.0,
            metalness: 0.0,
            roughness: 1.0,
            map: None,
        }
    }

    fn bodies() -> Vec<CelestialBody> {
        vec![
            CelestialBody::new(BodyId::Planet1, 2.3, Vec3::X * 8.0, Some(PivotId::A), 0.005, material()),
            CelestialBody::new(BodyId::Moon, 1.2, Vec3::new(1.0, 3.5, -6.0), None, 0.003, material()),
        ]
    }

    #[test]
    fn test_hover_converges_to_targets() {
        let mut bodies = bodies();
        let mut hover = HoverState::new();
        for _ in 0..120 {
            hover.update(Some(BodyId::Planet1), bodies.iter_mut());
        }
        assert!((bodies[0].scale() - 1.2).abs() < 1e-4);
        assert!((bodies[0].rotation_speed() - HOVER_ROTATION_SPEED).abs() < 1e-6);
        assert!((bodies[1].scale() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hover_is_eased_not_instant() {
        let mut bodies = bodies();
        let mut hover = HoverState::new();
        hover.update(Some(BodyId::Planet1), bodies.iter_mut());
        assert!((bodies[0].scale() - 1.04).abs() < 1e-6);
        assert!(bodies[0].scale() < 1.2);
    }

    #[test]
    fn test_converged_hover_is_a_fixed_point() {
        let mut bodies = bodies();
        let mut hover = HoverState::new();
        for _ in 0..200 {
            hover.update(Some(BodyId::Moon), bodies.iter_mut());
        }
        let (scale, speed) = (bodies[1].scale(), bodies[1].rotation_speed());
        for _ in 0..50 {
            hover.update(Some(BodyId::Moon), bodies.iter_mut());
        }
        assert!((bodies[1].scale() - scale).abs() < 1e-6);
        assert!((bodies[1].rotation_speed() - speed).abs() < 1e-7);
    }

    #[test]
    fn test_switching_hover_decays_previous() {
        let mut bodies = bodies();
        let mut hover = HoverState::new();
        for _ in 0..100 {
            hover.update(Some(BodyId::Planet1), bodies.iter_mut());
        }
        let changed = hover.update(Some(BodyId::Moon), bodies.iter_mut());
        assert_eq!(changed, Some(Some(BodyId::Planet1)));
        // One step back toward rest, not a snap.
        assert!(bodies[0].scale() < 1.2 && bodies[0].scale() > 1.1);
        for _ in 0..100 {
            hover.update(Some(BodyId::Moon), bodies.iter_mut());
        }
        assert!((bodies[0].scale() - 1.0).abs() < 1e-4);
        assert!((bodies[0].rotation_speed() - 0.005).abs() < 1e-6);
        assert!((bodies[1].scale() - 1.2).abs() < 1e-4);
    }

    #[test]
    fn test_unchanged_hover_reports_nothing() {
        let mut bodies = bodies();
        let mut hover = HoverState::new();
        assert_eq!(hover.update(None, bodies.iter_mut()), None);
        assert_eq!(
            hover.update(Some(BodyId::Moon), bodies.iter_mut()),
            Some(None)
        );
        assert_eq!(hover.update(Some(BodyId::Moon), bodies.iter_mut()), None);
        assert_eq!(
            hover.update(None, bodies.iter_mut()),
            Some(Some(BodyId::Moon))
        );
        assert_eq!(hover.hovered(), None);
    }

    #[test]
    fn test_pivot_carries_body_around_orbit() {
        let mut pivot = OrbitPivot::new(Vec3::new(0.0, 0.0, -10.0), std::f32::consts::FRAC_PI_2);
        let body = &bodies()[0];
        let start = body.world_center(pivot.matrix());
        assert!((start - Vec3::new(8.0, 0.0, -10.0)).length() < 1e-5);
        pivot.advance();
        let quarter = body.world_center(pivot.matrix());
        assert!((quarter - Vec3::new(0.0, 0.0, -18.0)).length() < 1e-4);
        assert!(((quarter - pivot.position).length() - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_spin_scales_with_factor() {
        let mut body = bodies().remove(0);
        body.spin(1.0);
        body.spin(REDUCED_MOTION_SPIN_FACTOR);
        assert!((body.rotation() - 0.005 * 1.4).abs() < 1e-7);
    }

    #[test]
    fn test_world_radius_follows_scale() {
        let mut body = bodies().remove(0);
        for _ in 0..200 {
            body.ease_hover(true);
        }
        assert!((body.world_radius() - 2.3 * 1.2).abs() < 1e-4);
    }
}

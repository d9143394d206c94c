//! Lights and fog.

use glam::Vec3;
use splash_render::EnvironmentUniform;

use crate::color::rgb_from_hex;

/// Uniform light from every direction.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    /// Light color.
    pub color: [f32; 3],
    /// Intensity multiplier.
    pub intensity: f32,
}

/// Parallel light shining from `position` toward the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Light color.
    pub color: [f32; 3],
    /// Intensity multiplier.
    pub intensity: f32,
    /// Source position; the light points at the origin.
    pub position: Vec3,
}

impl DirectionalLight {
    /// Unit vector the light travels along.
    pub fn direction(&self) -> Vec3 {
        (-self.position).normalize_or_zero()
    }
}

/// The scene's light rig.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    /// Soft white fill.
    pub ambient: AmbientLight,
    /// Cool key light.
    pub directional: DirectionalLight,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: rgb_from_hex(0xffffff),
                intensity: 0.4,
            },
            directional: DirectionalLight {
                color: rgb_from_hex(0xb0c4ff),
                intensity: 0.8,
                position: Vec3::new(5.0, 10.0, 7.0),
            },
        }
    }
}

/// Linear distance fog.
#[derive(Debug, Clone, PartialEq)]
pub struct Fog {
    /// Fog color.
    pub color: [f32; 3],
    /// Distance where fog starts.
    pub near: f32,
    /// Distance where fog is opaque.
    pub far: f32,
}

impl Fog {
    /// Fog amount in `[0, 1]` at a view distance.
    pub fn factor(&self, distance: f32) -> f32 {
        if self.far <= self.near {
            return if distance >= self.far { 1.0 } else { 0.0 };
        }
        ((distance - self.near) / (self.far - self.near)).clamp(0.0, 1.0)
    }
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: rgb_from_hex(0x06060a),
            near: 60.0,
            far: 300.0,
        }
    }
}

fn scaled(color: [f32; 3], k: f32) -> [f32; 4] {
    [color[0] * k, color[1] * k, color[2] * k, 0.0]
}

/// Pack the light rig and fog into the per-frame uniform block.
pub fn environment_uniform(lighting: &Lighting, fog: &Fog) -> EnvironmentUniform {
    let key = &lighting.directional;
    EnvironmentUniform {
        ambient: scaled(lighting.ambient.color, lighting.ambient.intensity),
        light_direction: key.direction().extend(0.0).to_array(),
        light_color: scaled(key.color, key.intensity),
        fog_color: scaled(fog.color, 1.0),
        fog_range: [fog.near, fog.far, 0.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fog_is_linear_between_near_and_far() {
        let fog = Fog::default();
        assert_eq!(fog.factor(10.0), 0.0);
        assert!((fog.factor(180.0) - 0.5).abs() < 1e-6);
        assert_eq!(fog.factor(500.0), 1.0);
    }

    #[test]
    fn test_degenerate_fog_is_a_step() {
        let fog = Fog {
            near: 50.0,
            far: 50.0,
            ..Fog::default()
        };
        assert_eq!(fog.factor(49.0), 0.0);
        assert_eq!(fog.factor(50.0), 1.0);
    }

    #[test]
    fn test_uniform_premultiplies_intensity() {
        let uniform = environment_uniform(&Lighting::default(), &Fog::default());
        assert!((uniform.ambient[0] - 0.4).abs() < 1e-6);
        assert!((uniform.light_color[2] - 0.8).abs() < 1e-6);
        assert_eq!(uniform.fog_range, [60.0, 300.0, 0.0, 0.0]);
        assert!(uniform.light_direction[1] < 0.0);
    }

    #[test]
    fn test_key_light_points_down_into_scene() {
        let lighting = Lighting::default();
        let dir = lighting.directional.direction();
        assert!(dir.y < 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert!(lighting.ambient.intensity < lighting.directional.intensity);
    }
}

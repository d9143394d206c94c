//! Scene contents for the splash: star field, aurora surface, orbiting bodies
//! with hover easing, lights and fog, and the builder that assembles them.

pub mod aurora;
pub mod celestial;
pub mod color;
pub mod environment;
pub mod scene;
pub mod starfield;

pub use aurora::{AURORA_SHADER_SOURCE, AuroraSurface, AuroraUniform};
pub use celestial::{
    BodyId, BodyMaterial, CelestialBody, Glow, HoverState, OrbitPivot, PivotId, ease_toward,
};
pub use color::{hsl_to_rgb, rgb_from_hex};
pub use environment::{AmbientLight, DirectionalLight, Fog, Lighting, environment_uniform};
pub use scene::{SceneGraph, SceneSettings};
pub use starfield::{StarField, shell_radius, twinkle_opacity};

//! Click explosions: short-lived bursts of points flying out from a hit point
//! and fading as their life runs down.

pub mod burst;
pub mod system;

pub use burst::{
    BURST_COLOR, BURST_DECAY, BURST_POINT_SIZE, BURST_POINTS, BURST_SPEED, ExplosionBurst,
    burst_material, sample_velocity,
};
pub use system::ExplosionSystem;

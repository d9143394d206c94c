//! Configuration for the splash scene.
//!
//! Settings persist to disk as a RON file, can be overridden from the command
//! line via clap, and deserialize with defaults for any missing section so
//! older config files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BloomSettings, BurstMotion, Config, DebugConfig, MotionConfig, SceneConfig, ViewportConfig,
    default_config_dir,
};
pub use error::ConfigError;

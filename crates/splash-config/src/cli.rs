//! Command-line argument parsing for the splash demo.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Splash command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "aurora-splash", about = "Aurora splash scene")]
pub struct CliArgs {
    /// Container width in logical pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Container height in logical pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Request reduced motion.
    #[arg(long)]
    pub reduced_motion: Option<bool>,

    /// Seed for star and explosion randomness.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Render without a window, driving a scripted pointer sweep.
    #[arg(long)]
    pub offscreen: bool,

    /// Number of frames an offscreen run lasts before unmounting.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Local image used as the moon texture.
    #[arg(long)]
    pub moon_texture: Option<PathBuf>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.viewport.width = w;
        }
        if let Some(h) = args.height {
            self.viewport.height = h;
        }
        if let Some(reduced) = args.reduced_motion {
            self.motion.reduced_motion = reduced;
        }
        if let Some(seed) = args.seed {
            self.scene.seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref path) = args.moon_texture {
            self.scene.moon_texture = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(400),
            reduced_motion: Some(true),
            seed: Some(42),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.viewport.width, 400);
        assert!(config.motion.reduced_motion);
        assert_eq!(config.scene.seed, Some(42));
        // Non-overridden fields retain defaults
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "aurora-splash",
            "--width",
            "800",
            "--reduced-motion",
            "true",
            "--frames",
            "30",
            "--offscreen",
        ]);
        assert!(args.offscreen);
        assert_eq!(args.width, Some(800));
        assert_eq!(args.reduced_motion, Some(true));
        assert_eq!(args.frames, 30);
        assert!(args.moon_texture.is_none());
    }
}

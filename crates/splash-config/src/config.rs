//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level splash configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Drawing surface settings.
    pub viewport: ViewportConfig,
    /// Scene contents.
    pub scene: SceneConfig,
    /// Motion and accessibility settings.
    pub motion: MotionConfig,
    /// Post-processing bloom settings.
    pub bloom: BloomSettings,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Drawing surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Container width in logical pixels.
    pub width: u32,
    /// Container height in logical pixels.
    pub height: u32,
    /// Device pixel ratio reported by the host.
    pub device_pixel_ratio: f32,
    /// Upper bound applied to the device pixel ratio for the renderer.
    pub max_pixel_ratio: f32,
}

/// Scene content configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Seed for star and explosion randomness. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Star count on regular screens.
    pub star_count: u32,
    /// Star count when the viewport is narrower than `small_screen_width`.
    pub small_screen_star_count: u32,
    /// Viewport width in logical pixels below which a screen counts as small.
    pub small_screen_width: f32,
    /// Optional local image used as the moon's surface texture.
    pub moon_texture: Option<PathBuf>,
}

/// How explosion particles advance each frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BurstMotion {
    /// Fixed displacement per rendered frame (speed follows the refresh rate).
    #[default]
    PerFrame,
    /// Displacement scaled by frame time, normalized to 60 Hz.
    TimeScaled,
}

/// Motion configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Host reported a reduced-motion preference.
    pub reduced_motion: bool,
    /// Explosion particle advancement mode.
    pub burst_motion: BurstMotion,
}

/// Bloom pass settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BloomSettings {
    /// Bloom strength with full motion.
    pub strength: f32,
    /// Bloom strength when reduced motion is requested.
    pub reduced_motion_strength: f32,
    /// Blur radius.
    pub radius: f32,
    /// Luminance threshold.
    pub threshold: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Emit a debug line per rendered frame.
    pub log_frame_stats: bool,
}

// --- Default implementations ---

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_pixel_ratio: 1.0,
            max_pixel_ratio: 1.8,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: None,
            star_count: 1500,
            small_screen_star_count: 600,
            small_screen_width: 768.0,
            moon_texture: None,
        }
    }
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 0.9,
            reduced_motion_strength: 0.4,
            radius: 0.6,
            threshold: 0.85,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_frame_stats: false,
        }
    }
}

impl ViewportConfig {
    /// Device pixel ratio clamped to `max_pixel_ratio`.
    pub fn effective_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio.min(self.max_pixel_ratio)
    }
}

impl SceneConfig {
    /// Star count for a viewport of the given width.
    pub fn star_count_for_width(&self, width: f32) -> u32 {
        if width < self.small_screen_width {
            self.small_screen_star_count
        } else {
            self.star_count
        }
    }
}

impl BloomSettings {
    /// Bloom strength honoring the reduced-motion preference.
    pub fn effective_strength(&self, reduced_motion: bool) -> f32 {
        if reduced_motion {
            self.reduced_motion_strength
        } else {
            self.strength
        }
    }
}

/// Platform config directory for the splash, if one can be resolved.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aurora-splash"))
}

// --- Load / Save / Reload ---

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new().depth_limit(3);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path,
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let new_config = read_config(&config_path)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("star_count: 1500"));
        assert!(ron_str.contains("PerFrame"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.scene.seed = Some(7);
        config.scene.moon_texture = Some(PathBuf::from("assets/moon.jpg"));
        config.motion.burst_motion = BurstMotion::TimeScaled;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(viewport: (width: 400))").unwrap();
        assert_eq!(config.viewport.width, 400);
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.bloom, BloomSettings::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(theme: \"dark\")");
        assert!(result.is_ok());
    }

    #[test]
    fn test_small_screen_star_count() {
        let scene = SceneConfig::default();
        assert_eq!(scene.star_count_for_width(767.0), 600);
        assert_eq!(scene.star_count_for_width(768.0), 1500);
        assert_eq!(scene.star_count_for_width(1920.0), 1500);
    }

    #[test]
    fn test_pixel_ratio_is_capped() {
        let viewport = ViewportConfig {
            device_pixel_ratio: 3.0,
            ..ViewportConfig::default()
        };
        assert!((viewport.effective_pixel_ratio() - 1.8).abs() < f32::EPSILON);

        let viewport = ViewportConfig {
            device_pixel_ratio: 1.25,
            ..ViewportConfig::default()
        };
        assert!((viewport.effective_pixel_ratio() - 1.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bloom_strength_follows_reduced_motion() {
        let bloom = BloomSettings::default();
        assert!((bloom.effective_strength(false) - 0.9).abs() < f32::EPSILON);
        assert!((bloom.effective_strength(true) - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.viewport.width = 400;
        config.motion.reduced_motion = true;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.scene.star_count = 900;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.scene.star_count), Some(900));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_reload_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::default().reload(dir.path()).unwrap_err();
        match err {
            ConfigError::Read { ref path, .. } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected read error, got {other:?}"),
        }
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}

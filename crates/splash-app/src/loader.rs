//! Resource loader: resolves queued textures and tracks load progress for the
//! host's loading indicator.
//!
//! A failed asset never surfaces as an error. It is logged, counted as
//! finished, and the target body simply stays untextured.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use splash_space::BodyId;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors produced while loading a single asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The bytes are not a decodable image.
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// The file extension is not a supported image format.
    #[error("unsupported asset format: {0}")]
    Unsupported(PathBuf),
}

/// Decoded RGBA8 texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixels.
    pub rgba: Vec<u8>,
}

/// Where textures come from.
pub trait AssetSource {
    /// Load and decode the texture at `path`.
    fn load(&mut self, path: &Path) -> Result<TextureData, AssetError>;
}

/// Loads PNG and JPEG files from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAssetSource;

impl AssetSource for FsAssetSource {
    fn load(&mut self, path: &Path) -> Result<TextureData, AssetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if !matches!(ext.as_deref(), Some("png" | "jpg" | "jpeg")) {
            return Err(AssetError::Unsupported(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = image::load_from_memory(&bytes)?.to_rgba8();
        Ok(TextureData {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }
}

/// Loading-session progress.
///
/// `percent` never decreases within a session; once `ready` is set it is no
/// longer updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    loaded: u32,
    total: u32,
    percent: u8,
    ready: bool,
}

impl LoadProgress {
    /// A session with nothing loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `loaded` of `total` assets have resolved. Returns the
    /// percentage now shown. A zero total leaves the percentage unchanged.
    pub fn on_asset_progress(&mut self, loaded: u32, total: u32) -> u8 {
        if self.ready || total == 0 {
            return self.percent;
        }
        let fraction = f64::from(loaded.min(total)) / f64::from(total);
        let percent = (fraction * 100.0).round() as u8;
        self.loaded = self.loaded.max(loaded.min(total));
        self.total = total;
        self.percent = self.percent.max(percent);
        self.percent
    }

    /// Mark the session finished. Returns `true` only on the first call.
    pub fn on_all_loaded(&mut self) -> bool {
        if self.ready {
            return false;
        }
        self.ready = true;
        true
    }

    /// Percentage in `0..=100`.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Assets resolved so far.
    pub fn loaded(&self) -> u32 {
        self.loaded
    }

    /// Assets in the session.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether every asset has resolved.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the host should still show its loading indicator.
    pub fn indicator_visible(&self) -> bool {
        !self.ready
    }
}

/// A texture resolved for a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTexture {
    /// Body the texture belongs to.
    pub target: BodyId,
    /// Decoded image.
    pub texture: TextureData,
}

/// Queue of texture requests resolved one per frame.
pub struct ResourceLoader {
    source: Box<dyn AssetSource>,
    queue: VecDeque<(BodyId, PathBuf)>,
    total: u32,
    finished: u32,
    failed: u32,
    progress: LoadProgress,
}

impl ResourceLoader {
    /// Start a session for the given requests. With no requests the session
    /// is ready immediately.
    pub fn new(source: Box<dyn AssetSource>, requests: Vec<(BodyId, PathBuf)>) -> Self {
        let total = requests.len() as u32;
        let mut progress = LoadProgress::new();
        if total == 0 {
            progress.on_all_loaded();
        }
        debug!(total, "resource loader started");
        Self {
            source,
            queue: requests.into(),
            total,
            finished: 0,
            failed: 0,
            progress,
        }
    }

    /// Resolve the next queued asset, if any.
    ///
    /// Returns the texture on success. A failure is logged and the asset is
    /// counted as finished either way.
    pub fn poll(&mut self) -> Option<LoadedTexture> {
        let (target, path) = self.queue.pop_front()?;
        let result = self.source.load(&path);
        self.finished += 1;
        let percent = self.progress.on_asset_progress(self.finished, self.total);

        let loaded = match result {
            Ok(texture) => {
                debug!(
                    body = target.name(),
                    width = texture.width,
                    height = texture.height,
                    percent,
                    "texture loaded"
                );
                Some(LoadedTexture { target, texture })
            }
            Err(e) => {
                warn!(body = target.name(), path = %path.display(), "texture load failed: {e}");
                self.failed += 1;
                None
            }
        };

        if self.queue.is_empty() && self.progress.on_all_loaded() {
            info!(
                loaded = self.finished - self.failed,
                failed = self.failed,
                "all assets resolved"
            );
        }
        loaded
    }

    /// Current progress.
    pub fn progress(&self) -> &LoadProgress {
        &self.progress
    }

    /// Requests still queued.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Requests that failed.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Drop any queued requests. Progress is left as is.
    pub fn cancel(&mut self) {
        self.queue.clear();
    }
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("pending", &self.queue.len())
            .field("total", &self.total)
            .field("finished", &self.finished)
            .field("progress", &self.progress)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory source that fails for paths containing "missing".
    struct StubSource;

    impl AssetSource for StubSource {
        fn load(&mut self, path: &Path) -> Result<TextureData, AssetError> {
            if path.to_string_lossy().contains("missing") {
                return Err(AssetError::Unsupported(path.to_path_buf()));
            }
            Ok(TextureData {
                width: 2,
                height: 1,
                rgba: vec![255; 8],
            })
        }
    }

    #[test]
    fn test_progress_rounds_percent() {
        let mut progress = LoadProgress::new();
        assert_eq!(progress.on_asset_progress(1, 4), 25);
        assert_eq!(progress.on_asset_progress(2, 4), 50);
        assert!(!progress.is_ready());
        assert_eq!(progress.on_asset_progress(1, 3), 50, "percent must not decrease");
        assert_eq!(progress.on_asset_progress(2, 3), 67);
    }

    #[test]
    fn test_zero_total_is_guarded() {
        let mut progress = LoadProgress::new();
        assert_eq!(progress.on_asset_progress(0, 0), 0);
        assert_eq!(progress.on_asset_progress(5, 0), 0);
    }

    #[test]
    fn test_ready_is_set_once_and_freezes_progress() {
        let mut progress = LoadProgress::new();
        progress.on_asset_progress(1, 2);
        assert!(progress.indicator_visible());
        assert!(progress.on_all_loaded());
        assert!(!progress.on_all_loaded());
        assert!(!progress.indicator_visible());
        assert_eq!(progress.on_asset_progress(2, 2), 50);
    }

    #[test]
    fn test_empty_loader_is_ready_at_start() {
        let loader = ResourceLoader::new(Box::new(StubSource), Vec::new());
        assert!(loader.progress().is_ready());
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn test_loader_resolves_one_per_poll() {
        let mut loader = ResourceLoader::new(
            Box::new(StubSource),
            vec![
                (BodyId::Moon, PathBuf::from("moon.png")),
                (BodyId::Planet1, PathBuf::from("planet.png")),
            ],
        );
        let first = loader.poll().unwrap();
        assert_eq!(first.target, BodyId::Moon);
        assert_eq!(loader.progress().percent(), 50);
        assert!(!loader.progress().is_ready());
        loader.poll().unwrap();
        assert_eq!(loader.progress().percent(), 100);
        assert!(loader.progress().is_ready());
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_failed_asset_still_advances_progress() {
        let mut loader = ResourceLoader::new(
            Box::new(StubSource),
            vec![(BodyId::Moon, PathBuf::from("missing.png"))],
        );
        assert!(loader.poll().is_none());
        assert_eq!(loader.failed(), 1);
        assert_eq!(loader.progress().percent(), 100);
        assert!(loader.progress().is_ready());
    }

    #[test]
    fn test_fs_source_decodes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moon.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        let texture = FsAssetSource.load(&path).unwrap();
        assert_eq!((texture.width, texture.height), (4, 2));
        assert_eq!(texture.rgba.len(), 4 * 2 * 4);
        assert_eq!(&texture.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_fs_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        assert!(matches!(
            FsAssetSource.load(&missing),
            Err(AssetError::Io { .. })
        ));
        assert!(matches!(
            FsAssetSource.load(&dir.path().join("moon.tga")),
            Err(AssetError::Unsupported(_))
        ));
        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not an image").unwrap();
        assert!(matches!(
            FsAssetSource.load(&garbage),
            Err(AssetError::Decode(_))
        ));
    }
}

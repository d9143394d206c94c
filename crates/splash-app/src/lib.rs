//! Splash scene runtime: asset loading, pointer picking, the frame schedule,
//! the mount/resize/unmount lifecycle tying the scene crates together, and
//! the window that hosts it.

pub mod loader;
pub mod picker;
pub mod scene;
pub mod scheduler;
pub mod window;


pub use loader::{
    AssetError, AssetSource, FsAssetSource, LoadProgress, LoadedTexture, ResourceLoader,
    TextureData,
};
pub use picker::{PickHit, pick, pick_nearest};
pub use scene::SplashScene;
pub use scheduler::{FrameClock, FrameScheduler, FrameStage, MAX_FRAME_TIME};
pub use window::{SplashWindow, WindowError, run};

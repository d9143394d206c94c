//! Window creation and event handling via winit.
//!
//! [`SplashWindow`] implements winit's [`ApplicationHandler`]: it mounts a
//! [`SplashScene`] presenting through a [`WgpuBackend`] once the window
//! exists, forwards pointer and resize events to it and ticks it on every
//! redraw. [`run`] starts the event loop.

use std::sync::Arc;

use splash_config::Config;
use splash_input::InputEvent;
use splash_render::{RenderContextError, WgpuBackend, init_window_context_blocking};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::loader::FsAssetSource;
use crate::scene::SplashScene;
use crate::scheduler::FrameClock;

/// Window title.
pub const WINDOW_TITLE: &str = "Aurora Splash";

/// Why the windowed run ended early.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Create(#[from] winit::error::OsError),

    #[error("GPU initialization failed: {0}")]
    Gpu(#[from] RenderContextError),
}

/// Returns [`WindowAttributes`] sized to the configured viewport.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(WINDOW_TITLE)
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.viewport.width as f64,
            config.viewport.height as f64,
        ))
}

/// Logical size of a physical size at `scale_factor`, at least 1×1.
fn logical_size(size: PhysicalSize<u32>, scale_factor: f64) -> (u32, u32) {
    let logical = size.to_logical::<f64>(scale_factor);
    (
        (logical.width.round() as u32).max(1),
        (logical.height.round() as u32).max(1),
    )
}

/// Window, GPU-backed scene and frame clock.
pub struct SplashWindow {
    config: Config,
    window: Option<Arc<Window>>,
    scene: Option<SplashScene<WgpuBackend>>,
    clock: FrameClock,
    failure: Option<WindowError>,
}

impl SplashWindow {
    /// A handler that will mount the scene with `config` once resumed.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            scene: None,
            clock: FrameClock::new(),
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, failure: WindowError) {
        error!("{failure}");
        self.failure = Some(failure);
        event_loop.exit();
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop) -> Result<(), WindowError> {
        let window = Arc::new(event_loop.create_window(window_attributes_from_config(&self.config))?);
        let scale_factor = window.scale_factor();
        let physical = window.inner_size();
        let (width, height) = logical_size(physical, scale_factor);

        let ctx = init_window_context_blocking(window.clone())?;
        let mut config = self.config.clone();
        config.viewport.width = width;
        config.viewport.height = height;
        config.viewport.device_pixel_ratio = scale_factor as f32;
        info!(
            width,
            height,
            scale_factor,
            pixel_ratio = config.viewport.effective_pixel_ratio(),
            "window created"
        );

        let scene = SplashScene::mount(config, WgpuBackend::new(ctx), Box::new(FsAssetSource))
            .with_open_callback(|| info!("host received open"));
        self.scene = Some(scene);
        self.clock = FrameClock::new();
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut scene) = self.scene.take() {
            info!(
                frames = scene.frame(),
                presented = scene.backend().frames_presented(),
                skipped = scene.backend().frames_skipped(),
                bursts_spawned = scene.explosions().spawned(),
                "closing splash window"
            );
            scene.unmount();
        }
        event_loop.exit();
    }

    fn scale_factor(&self) -> f64 {
        self.window.as_ref().map_or(1.0, |w| w.scale_factor())
    }
}

impl ApplicationHandler for SplashWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(failure) = self.mount(event_loop) {
            self.fail(event_loop, failure);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let scale_factor = self.scale_factor();
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested, unmounting");
                self.close(event_loop);
            }
            WindowEvent::Resized(physical) => {
                scene
                    .backend_mut()
                    .resize_surface(physical.width, physical.height);
                let (width, height) = logical_size(physical, scale_factor);
                scene.push_event(InputEvent::Resized { width, height });
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // The pixel ratio is fixed at mount; the Resized that follows
                // carries the new surface size.
                warn!(scale_factor, "scale factor changed after mount");
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(scale_factor);
                scene.push_event(InputEvent::PointerMoved {
                    client_x: logical.x,
                    client_y: logical.y,
                });
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                scene.push_event(InputEvent::Click);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Enter),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                scene.open();
            }
            WindowEvent::RedrawRequested => {
                let dt = self.clock.tick();
                if !scene.tick(dt) {
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut scene) = self.scene.take() {
            scene.unmount();
        }
    }
}

/// Creates an event loop and runs the splash until the window is closed.
pub fn run(config: Config) -> Result<(), WindowError> {
    let event_loop = EventLoop::new()?;
    let mut app = SplashWindow::new(config);
    event_loop.run_app(&mut app)?;
    match app.failure.take() {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_size_divides_by_scale() {
        assert_eq!(logical_size(PhysicalSize::new(2560, 1440), 2.0), (1280, 720));
        assert_eq!(logical_size(PhysicalSize::new(1000, 750), 1.25), (800, 600));
    }

    #[test]
    fn test_logical_size_never_zero() {
        assert_eq!(logical_size(PhysicalSize::new(0, 1), 2.0), (1, 1));
    }

    #[test]
    fn test_attributes_follow_viewport() {
        let mut config = Config::default();
        config.viewport.width = 900;
        config.viewport.height = 500;
        let attrs = window_attributes_from_config(&config);
        assert_eq!(attrs.title, WINDOW_TITLE);
        assert_eq!(
            attrs.inner_size,
            Some(winit::dpi::LogicalSize::new(900.0, 500.0).into())
        );
    }
}

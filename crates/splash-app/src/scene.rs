//! The splash scene lifecycle: mount, per-frame tick, resize and unmount.
//!
//! Everything the scene allocates is recorded in one [`GpuResources`] ledger.
//! Unmount cancels the frame schedule first, then removes listeners, then
//! releases bursts, scene meshes, the composer and finally the renderer.
//! Pending creations and releases reach the backend right before each
//! composite and once more at unmount. Dropping a mounted scene unmounts it.

use std::path::PathBuf;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use splash_config::Config;
use splash_input::{CanvasRect, InputEvent, InputQueue, PointerState};
use splash_particles::ExplosionSystem;
use splash_render::{
    BloomPass, Camera, Composer, FrameSnapshot, GpuResources, RenderBackend, ResourceKind,
};
use splash_space::{BodyId, SceneGraph, SceneSettings};
use tracing::{debug, info, trace, warn};

use crate::loader::{AssetSource, LoadProgress, ResourceLoader};
use crate::picker::{PickHit, pick};
use crate::scheduler::{FrameScheduler, FrameStage, MAX_FRAME_TIME};

/// Frames between frame-stat log lines when enabled.
const FRAME_STATS_INTERVAL: u64 = 60;

/// A mounted splash scene presenting through `B`.
pub struct SplashScene<B: RenderBackend> {
    config: Config,
    backend: B,
    gpu: GpuResources,
    camera: Camera,
    composer: Composer,
    scene: Option<SceneGraph>,
    explosions: ExplosionSystem,
    input: InputQueue,
    pointer: PointerState,
    rect: CanvasRect,
    loader: ResourceLoader,
    scheduler: FrameScheduler,
    rng: ChaCha8Rng,
    elapsed: f32,
    frame: u64,
    last_stages: Vec<FrameStage>,
    on_open: Option<Box<dyn FnOnce()>>,
    mounted: bool,
}

impl<B: RenderBackend> SplashScene<B> {
    /// Allocate the renderer, composer and scene for the configured viewport,
    /// register listeners and request the first frame.
    pub fn mount(config: Config, mut backend: B, source: Box<dyn AssetSource>) -> Self {
        let width = config.viewport.width;
        let height = config.viewport.height;
        let reduced_motion = config.motion.reduced_motion;
        let mut gpu = GpuResources::new();

        gpu.allocate(ResourceKind::Renderer, "renderer");
        backend.set_size(width, height);

        let bloom = BloomPass::new(
            config.bloom.effective_strength(reduced_motion),
            config.bloom.radius,
            config.bloom.threshold,
            width,
            height,
        );
        let composer = Composer::new(
            width,
            height,
            config.viewport.effective_pixel_ratio(),
            bloom,
        );
        gpu.allocate(ResourceKind::Composer, "composer");

        let camera = Camera::splash(width, height);

        let seed = config.scene.seed.unwrap_or_else(|| rand::random());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let star_count = config.scene.star_count_for_width(width as f32) as usize;
        let scene = SceneGraph::build(
            SceneSettings {
                star_count,
                reduced_motion,
            },
            &mut rng,
            &mut gpu,
        );

        let requests: Vec<(BodyId, PathBuf)> = config
            .scene
            .moon_texture
            .clone()
            .map(|path| (BodyId::Moon, path))
            .into_iter()
            .collect();
        let loader = ResourceLoader::new(source, requests);

        let mut input = InputQueue::new();
        input.register_all();

        info!(
            width,
            height,
            seed,
            star_count,
            reduced_motion,
            "splash scene mounted"
        );

        Self {
            explosions: ExplosionSystem::new(config.motion.burst_motion),
            config,
            backend,
            gpu,
            camera,
            composer,
            scene: Some(scene),
            input,
            pointer: PointerState::new(),
            rect: CanvasRect::from_size(width as f32, height as f32),
            loader,
            scheduler: FrameScheduler::start(),
            rng,
            elapsed: 0.0,
            frame: 0,
            last_stages: Vec::with_capacity(FrameStage::ORDER.len()),
            on_open: None,
            mounted: true,
        }
    }

    /// Set the host callback invoked by [`open`](Self::open).
    pub fn with_open_callback(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_open = Some(Box::new(callback));
        self
    }

    /// Set where the canvas sits in the viewport, for pointer mapping.
    pub fn set_canvas_rect(&mut self, rect: CanvasRect) {
        self.rect = rect;
    }

    /// Queue a host event for the next frame. Returns `false` once the
    /// listener for it has been removed.
    pub fn push_event(&mut self, event: InputEvent) -> bool {
        self.input.push(event)
    }

    /// Run one frame consuming `dt` seconds. Returns `false` when no frame
    /// was pending (after unmount).
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.scheduler.begin_frame() {
            return false;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_TIME)
        } else {
            0.0
        };

        self.drain_input();
        self.poll_assets();

        self.elapsed += dt;
        self.frame += 1;
        self.last_stages.clear();
        for stage in FrameStage::ORDER {
            self.run_stage(stage, dt);
            self.last_stages.push(stage);
        }

        self.scheduler.end_frame();

        if self.config.debug.log_frame_stats && self.frame % FRAME_STATS_INTERVAL == 0 {
            debug!(
                frame = self.frame,
                elapsed = self.elapsed,
                bursts = self.explosions.len(),
                hovered = ?self.scene.as_ref().and_then(SceneGraph::hovered),
                "frame stats"
            );
        }
        true
    }

    fn drain_input(&mut self) {
        let events: Vec<InputEvent> = self.input.drain().collect();
        for event in events {
            match event {
                InputEvent::PointerMoved { client_x, client_y } => {
                    self.pointer.on_pointer_moved(&self.rect, client_x, client_y);
                }
                InputEvent::Click => self.handle_click(),
                InputEvent::Resized { width, height } => {
                    self.resize(width, height);
                }
            }
        }
    }

    fn handle_click(&mut self) {
        match self.pick_pointer() {
            Some(hit) => {
                debug!(body = hit.body.name(), distance = hit.distance, "click hit");
                self.explosions.spawn(hit.point, &mut self.rng, &mut self.gpu);
            }
            None => trace!("click missed"),
        }
    }

    fn poll_assets(&mut self) {
        let Some(loaded) = self.loader.poll() else {
            return;
        };
        if let Some(scene) = self.scene.as_mut() {
            scene.attach_texture(
                loaded.target,
                loaded.texture.width,
                loaded.texture.height,
                loaded.texture.rgba,
                &mut self.gpu,
            );
        }
    }

    fn pick_pointer(&self) -> Option<PickHit> {
        pick(&self.camera, self.pointer.ndc(), self.scene.as_ref())
    }

    fn run_stage(&mut self, stage: FrameStage, dt: f32) {
        match stage {
            FrameStage::Twinkle => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.twinkle(self.elapsed);
                }
            }
            FrameStage::Orbit => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.advance_orbits();
                }
            }
            FrameStage::Rotation => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.spin_bodies();
                }
            }
            FrameStage::Hover => {
                // The pointer rests at the canvas center until it first moves.
                let hit = self.pick_pointer().map(|hit| hit.body);
                if let Some(scene) = self.scene.as_mut()
                    && let Some(previous) = scene.update_hover(hit)
                {
                    trace!(?previous, current = ?hit, "hover changed");
                }
            }
            FrameStage::Explosions => {
                self.explosions.tick(dt, &mut self.gpu);
            }
            FrameStage::ShaderUniforms => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.set_aurora_time(self.elapsed);
                }
            }
            FrameStage::Composite => {
                let (destroyed, created) = self.gpu.sync_to(&mut self.backend);
                if destroyed + created > 0 {
                    trace!(destroyed, created, "gpu resources synced");
                }
                let snapshot = self.snapshot();
                self.backend.render(&self.composer, &snapshot);
            }
        }
    }

    /// What the next composite would present.
    pub fn snapshot(&self) -> FrameSnapshot {
        let mut snapshot = FrameSnapshot {
            frame: self.frame,
            elapsed: self.elapsed,
            camera: self.camera.to_uniform(),
            ..FrameSnapshot::default()
        };
        if let Some(scene) = &self.scene {
            snapshot.aurora_time = scene.aurora.time();
            snapshot.environment = scene.environment();
            snapshot.meshes = scene.mesh_draws();
            snapshot.points.push(scene.star_draw());
        }
        snapshot.points.extend(self.explosions.draws());
        snapshot
    }

    /// Re-fit camera, renderer and composer to a new container size.
    ///
    /// Zero dimensions are skipped until a valid size arrives. Returns whether
    /// the resize was applied.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if !self.mounted {
            return false;
        }
        if width == 0 || height == 0 {
            debug!(width, height, "resize skipped: zero dimension");
            return false;
        }
        self.camera.set_aspect_ratio(width as f32, height as f32);
        self.backend.set_size(width, height);
        self.composer.set_size(width, height);
        self.rect = CanvasRect {
            width: width as f32,
            height: height as f32,
            ..self.rect
        };
        self.config.viewport.width = width;
        self.config.viewport.height = height;
        debug!(width, height, "splash scene resized");
        true
    }

    /// Invoke the host's open callback. Only the first call has an effect.
    pub fn open(&mut self) -> bool {
        match self.on_open.take() {
            Some(callback) => {
                info!("splash opened");
                callback();
                true
            }
            None => false,
        }
    }

    /// Cancel the frame schedule, remove listeners and release every GPU
    /// resource exactly once. Later calls do nothing.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        self.scheduler.cancel();
        let listeners = self.input.remove_all();
        self.loader.cancel();

        let bursts = self.explosions.clear(&mut self.gpu);
        let meshes = self
            .scene
            .take()
            .map_or(0, |mut scene| scene.dispose(&mut self.gpu));
        // Composer, then renderer.
        let owned = self.gpu.release_all();
        if owned != 2 {
            warn!(owned, "unexpected allocations left at unmount");
        }
        let (destroyed, _) = self.gpu.sync_to(&mut self.backend);
        self.backend.dispose();

        info!(
            frames = self.frame,
            listeners,
            bursts,
            meshes,
            destroyed,
            released = self.gpu.released_count(),
            "splash scene unmounted"
        );
    }

    /// Whether the scene is mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether a next frame is requested.
    pub fn is_running(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Loading indicator state.
    pub fn load_progress(&self) -> &LoadProgress {
        self.loader.progress()
    }

    /// Scene contents; `None` after unmount.
    pub fn scene(&self) -> Option<&SceneGraph> {
        self.scene.as_ref()
    }

    /// Live explosions.
    pub fn explosions(&self) -> &ExplosionSystem {
        &self.explosions
    }

    /// The camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The post-processing composer.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// The render backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The render backend, mutably. Used by the window to resize its surface.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The GPU resource ledger.
    pub fn gpu(&self) -> &GpuResources {
        &self.gpu
    }

    /// Current pointer state.
    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Canvas placement used for pointer mapping.
    pub fn canvas_rect(&self) -> CanvasRect {
        self.rect
    }

    /// Accumulated frame time in seconds.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Frames run since mount.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Stages the last frame ran, in order.
    pub fn last_stages(&self) -> &[FrameStage] {
        &self.last_stages
    }

    /// Active configuration, including applied resizes.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<B: RenderBackend> Drop for SplashScene<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}

//! Splash demo. Opens a window by default; `--offscreen` mounts the scene on
//! an offscreen GPU target, sweeps a pointer across it with a few clicks, runs
//! the requested number of frames and unmounts.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use splash_app::{FrameClock, FsAssetSource, SplashScene};
use splash_config::{CliArgs, Config, default_config_dir};
use splash_input::InputEvent;
use splash_render::{WgpuBackend, init_offscreen_context_blocking};
use tracing::{error, info};

/// Target frame interval.
const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);
/// Frames between scripted clicks.
const CLICK_EVERY: u32 = 90;

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from(".aurora-splash"));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    splash_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if args.offscreen {
        run_offscreen(config, args.frames);
    } else if let Err(e) = splash_app::run(config) {
        error!("splash window failed: {e}");
        std::process::exit(1);
    }
}

fn run_offscreen(config: Config, frames: u32) {
    let (width, height) = (config.viewport.width, config.viewport.height);
    let ctx = match init_offscreen_context_blocking(width, height) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("GPU initialization failed: {e}");
            std::process::exit(1);
        }
    };
    let (width, height) = (width as f32, height as f32);
    let mut scene = SplashScene::mount(config, WgpuBackend::new(ctx), Box::new(FsAssetSource))
        .with_open_callback(|| info!("host received open"));

    let mut clock = FrameClock::new();
    let mut clicks = 0u32;
    for frame in 0..frames {
        // Sweep the pointer left to right along a sine path through the middle.
        let t = frame as f32 / frames.max(1) as f32;
        let client_x = t * width;
        let client_y = height * (0.5 + 0.2 * (t * std::f32::consts::TAU).sin());
        scene.push_event(InputEvent::PointerMoved { client_x, client_y });
        if frame % CLICK_EVERY == CLICK_EVERY - 1 {
            scene.push_event(InputEvent::Click);
            clicks += 1;
        }

        std::thread::sleep(FRAME_INTERVAL);
        let dt = clock.tick();
        if !scene.tick(dt) {
            break;
        }
    }

    scene.open();

    let frames = scene.frame();
    let elapsed = scene.elapsed();
    let spawned = scene.explosions().spawned();
    let live_bursts = scene.explosions().len();
    let presented = scene.backend().frames_presented();
    let skipped = scene.backend().frames_skipped();
    let load_percent = scene.load_progress().percent();

    scene.unmount();

    info!(
        frames,
        presented,
        skipped,
        elapsed,
        clicks,
        spawned,
        live_bursts,
        load_percent,
        leaked = scene.gpu().live_count(),
        "splash demo finished"
    );
    println!("Aurora splash (offscreen)");
    println!("  frames:     {frames} ({elapsed:.2}s)");
    println!("  presented:  {presented}");
    println!("  clicks:     {clicks}, bursts spawned: {spawned}");
    println!("  assets:     {load_percent}%");
    println!("  released:   {}", scene.gpu().released_count());
}

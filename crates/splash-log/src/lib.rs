//! Structured logging for the splash scene.
//!
//! Console output with uptime timestamps and targets, plus a JSON file layer in
//! debug builds. The filter honours `RUST_LOG` first, then the config's
//! `debug.log_level`.

use splash_config::Config;
use std::fs::File;
use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";
const LOG_FILE: &str = "splash.log";

/// Resolve the filter string from an optional config.
fn filter_string(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (only used when `debug_build`)
/// * `debug_build` - enables file logging
/// * `config` - optional configuration supplying the log level
///
/// Calling this twice is harmless: the second install attempt is ignored.
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_string(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = File::create(log_dir.join(LOG_FILE))
    {
        let _ = subscriber.with(json_file_layer(log_file)).try_init();
        return;
    }

    let _ = subscriber.try_init();
}

/// JSON lines written to `file`, one object per event.
fn json_file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_timer(fmt::time::uptime())
        .json()
}

/// The default filter used when neither `RUST_LOG` nor a config is present.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

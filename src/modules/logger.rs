use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AppResult;
use crate::modules::config::get_data_dir;

const LOG_FILE_PREFIX: &str = "gateway.log";

pub fn get_log_dir(configured: Option<&str>) -> AppResult<PathBuf> {
    let log_dir = match configured {
        Some(dir) => PathBuf::from(dir),
        None => get_data_dir()?.join("logs"),
    };

    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    Ok(log_dir)
}

/// Initialize logger system
///
/// Console output always; a daily rolling file when the log directory is
/// usable. Safe to call more than once.
pub fn init_logger(configured_dir: Option<&str>) {
    // Capture `log` crate records (reqwest, hyper internals)
    let _ = tracing_log::LogTracer::init();

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match get_log_dir(configured_dir) {
        Ok(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // The guard flushes on drop; keep it for the life of the process
            std::mem::forget(guard);
            Some(
                fmt::Layer::new()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true),
            )
        }
        Err(e) => {
            eprintln!("Failed to initialize log directory: {}", e);
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    info!("Logger system initialized");
}

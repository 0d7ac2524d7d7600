use anyhow::{Context, Result};
use directories::BaseDirs;
use std::{fs, path::PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub fn log_dir() -> Option<PathBuf> {
    let base = BaseDirs::new()?;
    Some(base.data_dir().join("relay").join("logs"))
}

/// Logs go to a daily file so they never interleave with streamed text on stdout.
/// Keep the returned guard alive for the life of the process.
pub fn init() -> Result<Option<WorkerGuard>> {
    let Some(dir) = log_dir() else {
        return Ok(None);
    };
    fs::create_dir_all(&dir).with_context(|| format!("create log dir: {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(&dir, "relay.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env("RELAY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))?;
    Ok(Some(guard))
}

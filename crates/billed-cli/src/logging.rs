// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BILLED_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

/// Builds the filter from `BILLED_LOG`, falling back to `info`.
pub fn log_filter(raw: Option<&str>) -> Result<EnvFilter> {
    let directives = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVES);
    EnvFilter::try_new(directives).with_context(|| {
        format!("invalid {LOG_ENV} value {directives:?}; try `info` or `billed_app=debug`")
    })
}

/// Sends log records to `billed.log` in `dir`. The terminal belongs to the UI, so
/// nothing is written to stderr.
pub fn init(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("billed.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;
    let filter = log_filter(env::var(LOG_ENV).ok().as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(path)
}

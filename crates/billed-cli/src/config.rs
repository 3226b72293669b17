// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use billed_app::{DashboardSettings, FilterOptions, NavigationPolicy, SessionUser, TEST_ACCOUNTS};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "5s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub dashboard: Dashboard,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            storage: Storage::default(),
            dashboard: Dashboard::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(billed_store::DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dashboard {
    pub test_mode: Option<bool>,
    pub navigate_on_update: Option<String>,
    pub test_accounts: Option<Vec<String>>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("BILLED_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set BILLED_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(billed_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [api], [storage], and [dashboard]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(db_path) = &self.storage.db_path {
            billed_db::validate_db_path(db_path)?;
        }

        if let Some(policy) = &self.dashboard.navigate_on_update
            && NavigationPolicy::parse(policy).is_none()
        {
            bail!(
                "dashboard.navigate_on_update in {} must be \"always\" or \"on_success\", got {policy:?}",
                path.display()
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(billed_store::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => billed_db::default_db_path(),
        }
    }

    pub fn test_mode(&self) -> bool {
        self.dashboard.test_mode.unwrap_or(false)
    }

    pub fn navigation_policy(&self) -> NavigationPolicy {
        self.dashboard
            .navigate_on_update
            .as_deref()
            .and_then(NavigationPolicy::parse)
            .unwrap_or_default()
    }

    pub fn test_accounts(&self) -> Vec<String> {
        match &self.dashboard.test_accounts {
            Some(accounts) => accounts.clone(),
            None => TEST_ACCOUNTS.iter().map(|email| (*email).to_owned()).collect(),
        }
    }

    pub fn dashboard_settings(&self, session: &SessionUser) -> DashboardSettings {
        let filter = if self.test_mode() {
            FilterOptions::test_mode()
        } else {
            FilterOptions::for_session(Some(session), &self.test_accounts())
        };
        DashboardSettings {
            filter,
            navigation: self.navigation_policy(),
        }
    }

    pub fn example_config(path: &Path) -> String {
        let accounts = TEST_ACCOUNTS
            .iter()
            .map(|email| format!("\"{email}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "# billed config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/billed/billed.db)\n# db_path = \"/absolute/path/to/billed.db\"\n\n[dashboard]\n# Keep every bill owner visible, including seeded test accounts.\ntest_mode = false\n# \"always\" or \"on_success\"\nnavigate_on_update = \"always\"\ntest_accounts = [{accounts}]\n",
            path.display(),
            billed_store::DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

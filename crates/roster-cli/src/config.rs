// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use roster_api::ApiConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "roster";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_API_TIMEOUT: &str = "10s";
const DEFAULT_TOAST_DURATION: &str = "5s";
const DEFAULT_LOG_FILTER: &str = "info";
const CONFIG_PATH_ENV: &str = "ROSTER_CONFIG_PATH";
const API_URL_ENV: &str = "ROSTER_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            export: Export::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub toast_duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Export {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub path: Option<String>,
    pub filter: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.validate(path)?;
            return Ok(config);
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
                    "config file {} is not versioned. Add `version = 1` and place values under [api], [ui], [export] and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate it with --print-example-config",
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
        for (key, raw) in [
            ("api.timeout", self.api.timeout.as_deref()),
            ("ui.toast_duration", self.ui.toast_duration.as_deref()),
        ] {
            if let Some(raw) = raw
                && parse_duration(raw)? <= Duration::ZERO
            {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }

        if let Some(filter) = &self.log.filter
            && filter.trim().is_empty()
        {
            bail!("log.filter in {} must not be empty", path.display());
        }

        self.api_config()
            .with_context(|| format!("invalid [api] config in {}", path.display()))?;
        Ok(())
    }

    /// The configured URL wins; `ROSTER_API_URL` only fills in when the file
    /// leaves `[api].base_url` unset.
    pub fn api_base_url(&self) -> String {
        if let Some(url) = &self.api.base_url {
            return url.clone();
        }
        match env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => DEFAULT_API_BASE_URL.to_owned(),
        }
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_API_TIMEOUT))
    }

    pub fn api_config(&self) -> Result<ApiConfig> {
        ApiConfig::new(&self.api_base_url(), self.api_timeout()?)
    }

    pub fn toast_duration(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .toast_duration
                .as_deref()
                .unwrap_or(DEFAULT_TOAST_DURATION),
        )
    }

    pub fn export_dir(&self) -> Result<PathBuf> {
        match &self.export.dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => env::current_dir().context("resolve current directory for PDF export"),
        }
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_dir()
            .ok_or_else(|| anyhow!("cannot resolve data directory; set [log].path explicitly"))?;
        Ok(data_root.join(APP_NAME).join("roster.log"))
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# roster config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# {API_URL_ENV} is used when base_url is not set here\nbase_url = \"{DEFAULT_API_BASE_URL}\"\ntimeout = \"{DEFAULT_API_TIMEOUT}\"\n\n[ui]\ntoast_duration = \"{DEFAULT_TOAST_DURATION}\"\n\n[export]\n# Optional. Default is the current directory\n# dir = \"/absolute/path/to/exports\"\n\n[log]\n# Optional. Default is platform data dir (for example ~/.local/share/roster/roster.log)\n# path = \"/absolute/path/to/roster.log\"\nfilter = \"{DEFAULT_LOG_FILTER}\"\n",
            path.display(),
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::api::parse_base_url;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "NotesClient";
const APP_NAME: &str = "notes-client";

pub const CONFIG_ENV: &str = "NOTES_CLIENT_CONFIG";
pub const API_URL_ENV: &str = "NOTES_API_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load();
            self.write_default_config(&default_cfg)?;
            tracing::info!(path = %self.paths.config_file.display(), "wrote default config");
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dirs.data_local_dir().join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            state_dir,
            log_dir,
        })
    }

    /// Points at an explicit config file, keeping the discovered state dirs.
    pub fn with_config_file(mut self, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.config_dir = parent.to_path_buf();
        }
        self.config_file = file;
        self
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.log_dir, &self.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("notes-client.log")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiOptions,
    pub ui: UiOptions,
}

impl AppConfig {
    fn post_load(&mut self) {
        if self.ui.snippet_chars == 0 {
            tracing::warn!("ui.snippet_chars must be positive, falling back to 40");
            self.ui.snippet_chars = UiOptions::default().snippet_chars;
        }
        if self.ui.tick_rate_ms < 16 {
            tracing::warn!(tick_rate_ms = self.ui.tick_rate_ms, "tick rate too small, clamping");
            self.ui.tick_rate_ms = 16;
        }
    }

    /// Applies the `--api-url` flag and the `NOTES_API_BASE_URL` variable, in
    /// that order of precedence, over whatever the file provided. Only the
    /// winning URL is validated, so a broken file value can be overridden.
    pub fn apply_overrides(&mut self, api_url: Option<&str>) -> Result<()> {
        let from_env = env::var(API_URL_ENV).ok();
        self.override_base_url(api_url, from_env.as_deref())
    }

    fn override_base_url(&mut self, flag: Option<&str>, from_env: Option<&str>) -> Result<()> {
        let chosen = flag
            .into_iter()
            .chain(from_env)
            .map(str::trim)
            .find(|candidate| !candidate.is_empty());
        match chosen {
            Some(url) => {
                parse_base_url(url).with_context(|| format!("invalid API base URL {url:?}"))?;
                self.api.base_url = url.to_string();
            }
            None => {
                parse_base_url(&self.api.base_url)
                    .with_context(|| format!("invalid api.base_url {:?}", self.api.base_url))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub base_url: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub tick_rate_ms: u64,
    /// Characters of content shown under each title in the list.
    pub snippet_chars: usize,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            snippet_chars: 40,
        }
    }
}

impl UiOptions {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

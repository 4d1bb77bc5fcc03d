use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::constants::{
    CONFIG_JSON_ENV, CONFIG_PATH_ENV, DEFAULT_CONFIG_CANDIDATES,
};
use crate::models::PlayerConfig;
use crate::validation::validate;

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// A validated configuration together with its origin
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: PlayerConfig,
    pub source: ConfigSource,
}

/// Resolves `PlayerConfig` from the environment, disk, or defaults.
///
/// Evaluation order:
/// 1) `$MARQUEE_CONFIG_PATH` (TOML or JSON file),
/// 2) `$MARQUEE_CONFIG_JSON` (inline JSON),
/// 3) the first existing candidate file under `root`,
/// 4) defaults.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    load_dotenv: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            load_dotenv: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory candidate files are looked up relative to
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn without_dotenv(mut self) -> Self {
        self.load_dotenv = false;
        self
    }

    /// Load using the process environment, reading `.env` first when enabled
    pub fn load(&self) -> anyhow::Result<ConfigLoad> {
        if self.load_dotenv {
            match dotenvy::dotenv() {
                Ok(path) => debug!("loaded environment from {}", path.display()),
                Err(err) if err.not_found() => {}
                Err(err) => return Err(err).context("failed to read .env"),
            }
        }

        self.load_with(|key| env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with<F>(&self, lookup: F) -> anyhow::Result<ConfigLoad>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config, source) = self.resolve(&lookup)?;
        validate(&config).with_context(|| {
            format!("invalid player config from {source:?}")
        })?;
        info!(?source, "player config loaded");
        Ok(ConfigLoad { config, source })
    }

    fn resolve<F>(
        &self,
        lookup: &F,
    ) -> anyhow::Result<(PlayerConfig, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str.trim());
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = self.find_default_file() {
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((PlayerConfig::default(), ConfigSource::Default))
    }

    fn find_default_file(&self) -> Option<PathBuf> {
        DEFAULT_CONFIG_CANDIDATES
            .iter()
            .map(|candidate| self.root.join(candidate))
            .find(|path| path.exists())
    }
}

pub fn load_from_file(path: &Path) -> anyhow::Result<PlayerConfig> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!("failed to read player config from {}", path.display())
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents).with_context(|| {
            format!("invalid player config {}", path.display())
        }),
        Some("toml") | Some("tml") => toml::from_str(&contents).map_err(|err| {
            anyhow!("invalid player config {}: {}", path.display(), err)
        }),
        _ => parse_from_str(&contents, &path.display().to_string()),
    }
}

/// Parse a config of unknown format, TOML first and JSON second
pub fn parse_from_str(
    contents: &str,
    origin: &str,
) -> anyhow::Result<PlayerConfig> {
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!(
                "failed to parse player config {}: toml error: {}; json error: {}",
                origin,
                toml_err,
                json_err
            )
        })
    })
}

pub fn parse_json(raw: &str) -> anyhow::Result<PlayerConfig> {
    serde_json::from_str(raw)
        .map_err(|err| anyhow!("invalid player config json: {err}"))
}

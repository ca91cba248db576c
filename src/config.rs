use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::SpeciesInput;
use crate::error::SyncError;

pub const DEFAULT_CONFIG_FILE: &str = "species-sync.json";
pub const REGISTRY_TOKEN_VAR: &str = "IUCN_TOKEN";
pub const ARCHIVE_TOKEN_VAR: &str = "XENO_TOKEN";

pub const DEFAULT_REGISTRY_BASE_URL: &str = "https://api.iucnredlist.org/api/v4";
pub const DEFAULT_MAP_BASE_URL: &str = "https://www.iucnredlist.org/api/v4";
pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://xeno-canto.org/api/3";

const DEFAULT_PACING_MS: u64 = 400;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw contents of `species-sync.json`. Every field is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub species_list: Option<String>,
    #[serde(default)]
    pub dataset_output: Option<String>,
    #[serde(default)]
    pub report_output: Option<String>,
    #[serde(default)]
    pub assessment_cache: Option<String>,
    #[serde(default)]
    pub error_log: Option<String>,
    #[serde(default)]
    pub map_dir: Option<String>,
    #[serde(default)]
    pub sound_dir: Option<String>,
    #[serde(default)]
    pub pacing_ms: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub registry_base_url: Option<String>,
    #[serde(default)]
    pub map_base_url: Option<String>,
    #[serde(default)]
    pub archive_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub species_list: Utf8PathBuf,
    pub dataset_output: Utf8PathBuf,
    pub report_output: Utf8PathBuf,
    pub assessment_cache: Utf8PathBuf,
    pub error_log: Utf8PathBuf,
    pub map_dir: Utf8PathBuf,
    pub sound_dir: Utf8PathBuf,
    pub pacing: Duration,
    pub timeout: Duration,
    pub registry_base_url: String,
    pub map_base_url: String,
    pub archive_base_url: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `species-sync.json` when no path is given. Only an
    /// explicitly requested file is required to exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SyncError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let path_or = |value: Option<String>, default: &str| {
            Utf8PathBuf::from(value.unwrap_or_else(|| default.to_string()))
        };

        ResolvedConfig {
            species_list: path_or(config.species_list, "species_list.json"),
            dataset_output: path_or(config.dataset_output, "speciesData.json"),
            report_output: path_or(config.report_output, "fehlende_elemente_report.json"),
            assessment_cache: path_or(config.assessment_cache, "lastSavedAssessmentId.json"),
            error_log: path_or(config.error_log, "errors.log"),
            map_dir: path_or(config.map_dir, "Verbreitungskarten"),
            sound_dir: path_or(config.sound_dir, "sounds"),
            pacing: Duration::from_millis(config.pacing_ms.unwrap_or(DEFAULT_PACING_MS)),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            registry_base_url: trim_base(config.registry_base_url, DEFAULT_REGISTRY_BASE_URL),
            map_base_url: trim_base(config.map_base_url, DEFAULT_MAP_BASE_URL),
            archive_base_url: trim_base(config.archive_base_url, DEFAULT_ARCHIVE_BASE_URL),
        }
    }
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Pre-issued API tokens, one per upstream service.
#[derive(Clone)]
pub struct Credentials {
    pub registry_token: String,
    pub archive_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("registry_token", &"<redacted>")
            .field("archive_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Both tokens are mandatory; a blank value counts as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(SyncError::MissingCredential(name))
        };
        Ok(Self {
            registry_token: fetch(REGISTRY_TOKEN_VAR)?,
            archive_token: fetch(ARCHIVE_TOKEN_VAR)?,
        })
    }
}

pub fn load_species_list(path: &Utf8PathBuf) -> Result<Vec<SpeciesInput>, SyncError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| SyncError::SpeciesListRead(path.clone().into_std_path_buf()))?;
    serde_json::from_str(&content).map_err(|err| SyncError::SpeciesListParse(err.to_string()))
}

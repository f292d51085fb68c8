use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::admission::{AdmissionFilter, default_exclusions};
use crate::error::CatalogError;
use crate::ingest::IngestPolicy;
use crate::pokeapi::DEFAULT_BASE_URL;
use crate::remediation::{ImageRemediation, RemediationTable, default_remediations};

pub const DEFAULT_CONFIG_FILE: &str = "pokedex-loader.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub track_lineage: Option<bool>,
    #[serde(default)]
    pub progress_every: Option<usize>,
    #[serde(default)]
    pub exclude_forms: Option<Vec<String>>,
    #[serde(default)]
    pub image_remediations: Option<Vec<ImageRemediation>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_delay_ms: Option<u64>,
    #[serde(default)]
    pub species_limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub base_url: String,
    pub timeout: Duration,
    pub request_delay: Duration,
    pub species_limit: u32,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub database: Utf8PathBuf,
    pub source: ResolvedSource,
    pub track_lineage: bool,
    pub progress_every: usize,
    pub exclude_forms: Vec<String>,
    pub image_remediations: Vec<ImageRemediation>,
}

impl ResolvedConfig {
    pub fn policy(&self) -> IngestPolicy {
        IngestPolicy {
            admission: AdmissionFilter::new(self.exclude_forms.clone()),
            remediations: RemediationTable::new(self.image_remediations.clone()),
            track_lineage: self.track_lineage,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `pokedex-loader.json` in the working directory.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CatalogError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CatalogError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CatalogError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CatalogError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let database = match config.database {
            Some(database) => Utf8PathBuf::from(database),
            None => default_database_path()?,
        };

        let source = config.source.unwrap_or_default();
        let source = ResolvedSource {
            base_url: source
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(source.timeout_secs.unwrap_or(30)),
            request_delay: Duration::from_millis(source.request_delay_ms.unwrap_or(100)),
            species_limit: source.species_limit.unwrap_or(1025),
        };

        let exclude_forms = config.exclude_forms.unwrap_or_else(default_exclusions);
        if exclude_forms.iter().any(|pattern| pattern.is_empty()) {
            return Err(CatalogError::ConfigParse(
                "exclude_forms contains an empty pattern, which would match every form"
                    .to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            database,
            source,
            track_lineage: config.track_lineage.unwrap_or(true),
            progress_every: config.progress_every.unwrap_or(25),
            exclude_forms,
            image_remediations: config
                .image_remediations
                .unwrap_or_else(default_remediations),
        })
    }
}

pub fn default_database_path() -> Result<Utf8PathBuf, CatalogError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.data_dir().join("pokedex-loader").join("catalog.db"))
                .ok()
        })
        .ok_or_else(|| CatalogError::Filesystem("unable to resolve data directory".to_string()))
}

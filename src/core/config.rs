use crate::core::loader::DEFAULT_CHUNK_SIZE;
use crate::core::normalize::SourceFormat;
use crate::store::validate_table_name;
use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

const DEFAULT_SOURCE_URL: &str = "https://dados.cvm.gov.br/dados/FI/CAD/DADOS/cad_fi.csv";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_encoding() -> String {
    "latin1".to_string()
}

fn default_delimiter() -> char {
    ';'
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            url: default_source_url(),
            encoding: default_encoding(),
            delimiter: default_delimiter(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    pub fn format(&self) -> Result<SourceFormat> {
        let encoding = Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| anyhow!("Unknown source encoding: {}", self.encoding))?;
        if !self.delimiter.is_ascii() {
            bail!("Source delimiter must be ASCII, got {:?}", self.delimiter);
        }
        Ok(SourceFormat {
            encoding,
            delimiter: self.delimiter as u8,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "FUNDOS".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: None,
            table: default_table(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoadConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            chunk_size: default_chunk_size(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub download_path: Option<String>,
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when
    /// it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.source.format()?;
        self.chunk_size()?;
        validate_table_name(&self.database.table).context("Invalid database.table")?;
        Ok(())
    }

    pub fn chunk_size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.load.chunk_size).context("load.chunk_size must be greater than 0")
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.database.path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().join("fundos.db"))
    }

    pub fn download_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.download_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().join("cad_fi.csv"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("br", "dados", "cvm-fundos").context("Could not determine project directories")
}

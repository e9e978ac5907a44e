use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EigerConfig {
    pub system: SystemSection,
    pub paths: PathsSection,
    pub planning: PlanningSection,
    pub outbox: OutboxSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl EigerConfig {
    pub fn resolve_path<P: AsRef<Path>>(&self, candidate: P) -> PathBuf {
        let path = candidate.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.paths.base_dir).join(path)
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.database)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.backup_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemSection {
    pub node_name: String,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    pub base_dir: String,
    pub database: String,
    pub backup_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanningSection {
    pub max_duration_weeks: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxSection {
    pub poll_interval_seconds: u64,
    pub max_attempts: u32,
    pub schedule_seconds: Vec<u64>,
    pub jitter_seconds: u64,
    /// In-progress entries older than this are handed back to the queue.
    pub stale_after_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

pub fn load_eiger_config<P: AsRef<Path>>(path: P) -> Result<EigerConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

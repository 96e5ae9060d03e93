use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cloner::ClonerConfig;
use crate::matcher::MatcherConfig;
use crate::pipeline::PipelineConfig;
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub cloner: ClonerConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// On-disk layout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root of the journal and the per-task working directories.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
        }
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

impl StorageConfig {
    /// Directory holding the per-task scratch areas.
    pub fn tasks_root(&self) -> PathBuf {
        self.data_root.join("tasks")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Config view safe to expose over the API: the cloner helper environment
/// (which may carry credentials) is omitted.
#[derive(Debug, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub pipeline: PipelineConfig,
    pub matcher: MatcherConfig,
    pub cloner_helper: Vec<String>,
    pub cloner_timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            scheduler: config.scheduler.clone(),
            pipeline: config.pipeline.clone(),
            matcher: config.matcher.clone(),
            cloner_helper: config.cloner.helper_argv.clone(),
            cloner_timeout_secs: config.cloner.timeout_secs,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::services::config::RawSettings;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "REGISTRY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// 无配置文件时读取的环境变量前缀，例如 `REGISTRY_APP_NAME`
pub const ENV_PREFIX: &str = "REGISTRY_";

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 未配置时不启用注册中心集成
    #[serde(default)]
    pub eureka: Option<RawSettings>,
}

impl Config {
    /// 优先读取配置文件，不存在时退回到环境变量
    pub fn load() -> Result<Self, ConfigLoadError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if Path::new(&path).exists() {
            tracing::info!(path = %path, "Loading configuration file");
            Self::from_file(&path)
        } else {
            tracing::info!(prefix = ENV_PREFIX, "No configuration file, reading environment");
            Self::from_env_vars(std::env::vars())
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let config_str = fs::read_to_string(path)?;
        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self, ConfigLoadError> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    pub fn from_env_vars<I>(vars: I) -> Result<Self, ConfigLoadError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RawSettings = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        Ok(Self {
            eureka: (!raw.is_empty()).then_some(raw),
        })
    }
}

//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::ChainId;

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 链目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub include_testnets: bool,
    #[serde(default)]
    pub disabled_chains: Vec<ChainId>,
}

/// 投影缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub cache_enabled: bool,
    /// 最多缓存的账户数
    pub cache_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            include_testnets: std::env::var("ENGINE_INCLUDE_TESTNETS")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            disabled_chains: std::env::var("ENGINE_DISABLED_CHAINS")
                .ok()
                .map(|v| parse_chain_list(&v))
                .unwrap_or_default(),
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            cache_enabled: std::env::var("PROJECTION_CACHE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(true),
            cache_capacity: std::env::var("PROJECTION_CACHE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
        }
    }
}

/// "1, 137,abc" -> [1, 137]，无法解析的项忽略
fn parse_chain_list(raw: &str) -> Vec<ChainId> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<ChainId>().ok())
        .collect()
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
            projection: ProjectionConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if self.projection.cache_capacity == 0 {
            anyhow::bail!("PROJECTION_CACHE_CAPACITY must be greater than 0");
        }

        Ok(())
    }
}

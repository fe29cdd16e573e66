use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::models::amount::parse_decimal;
use crate::service::MatchPolicy;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid {field}: {value:?} (expected a non-negative decimal)")]
    InvalidTolerance { field: &'static str, value: String },
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 会话空闲超时 (秒)，超时后会话被回收
    pub session_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub slow_statement_secs: u64,
}

/// 匹配容差 (十进制字符串)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub amount_tolerance: String,
    pub balance_tolerance: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                session_ttl_secs: 1800,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/line_recon".to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
                slow_statement_secs: 5,
            },
            matching: MatchingConfig {
                amount_tolerance: "0".to_string(),
                balance_tolerance: "0.01".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载顺序: 默认值 -> config/line-recon.{toml,yaml,json} (可选) -> 环境变量
    ///
    /// 环境变量前缀 `LINE_RECON`，层级分隔符 `__`，例如 `LINE_RECON__SERVER__PORT`。
    /// 兼容旧的 `DATABASE_URL`。
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let settings = ::config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.session_ttl_secs", defaults.server.session_ttl_secs as i64)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("database.acquire_timeout_secs", defaults.database.acquire_timeout_secs as i64)?
            .set_default("database.slow_statement_secs", defaults.database.slow_statement_secs as i64)?
            .set_default("matching.amount_tolerance", defaults.matching.amount_tolerance)?
            .set_default("matching.balance_tolerance", defaults.matching.balance_tolerance)?
            .add_source(::config::File::with_name("config/line-recon").required(false))
            .add_source(::config::Environment::with_prefix("LINE_RECON").separator("__"))
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        Ok(config)
    }
}

impl ServerConfig {
    /// 会话空闲超时，0 表示不回收
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        let secs = u32::try_from(self.session_ttl_secs).unwrap_or(u32::MAX);
        (secs > 0).then(|| chrono::Duration::seconds(i64::from(secs)))
    }
}

impl MatchingConfig {
    pub fn policy(&self) -> Result<MatchPolicy, ConfigError> {
        Ok(MatchPolicy {
            amount_tolerance: parse_tolerance("matching.amount_tolerance", &self.amount_tolerance)?,
            balance_tolerance: parse_tolerance("matching.balance_tolerance", &self.balance_tolerance)?,
        })
    }
}

fn parse_tolerance(field: &'static str, value: &str) -> Result<BigDecimal, ConfigError> {
    parse_decimal(value)
        .filter(|v| *v >= BigDecimal::zero())
        .ok_or_else(|| ConfigError::InvalidTolerance {
            field,
            value: value.to_string(),
        })
}

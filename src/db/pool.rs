use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;

/// 创建 SAP 单据库连接池
///
/// 慢查询按 `slow_statement_secs` 以 WARN 级别记录。
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let connect_options = PgConnectOptions::from_str(&config.url)?
        .application_name("line-recon")
        .log_slow_statements(
            tracing::log::LevelFilter::Warn,
            Duration::from_secs(config.slow_statement_secs),
        );

    tracing::debug!(
        "connecting to {}:{} (max {} connections)",
        connect_options.get_host(),
        connect_options.get_port(),
        config.max_connections
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(connect_options)
        .await
}

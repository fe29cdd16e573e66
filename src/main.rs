use std::sync::Arc;
use std::time::Duration;
use line_recon::{api, create_pool, service::PgSourceLineProvider, AppConfig, SessionStore};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

/// 超时会话清理间隔
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    let policy = config.matching.policy()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let provider = Arc::new(PgSourceLineProvider::new(pool));
    let store = SessionStore::new(provider, policy).with_ttl(config.server.session_ttl());
    if config.server.session_ttl().is_some() {
        store.spawn_sweeper(SESSION_SWEEP_INTERVAL);
        info!("Idle sessions expire after {}s", config.server.session_ttl_secs);
    }
    let app = api::router(store);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST   /api/sessions                                - create session from invoice lines");
    info!("  GET    /api/sessions/:id                            - snapshot");
    info!("  DELETE /api/sessions/:id                            - discard");
    info!("  PUT    /api/sessions/:id/reference                  - select reference document");
    info!("  POST   /api/sessions/:id/swap                       - swap two invoice lines");
    info!("  POST   /api/sessions/:id/auto-match                 - full re-match");
    info!("  POST   /api/sessions/:id/targets/:target_id/toggle  - toggle selection");
    info!("  GET    /api/sessions/:id/export                     - CSV export");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! 主应用程序入口
//!
//! 加载配置、装配聊天核心并启动 Axum 服务。

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use application::{
    create_pg_pool, ChatService, ChatServiceDependencies, MemoryMessageStore, MessageStore,
    PgMessageStore, PresenceRegistry, RateLimiter, SessionValidator,
};
use config::AppConfig;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "配置未通过生产校验，仅适用于开发环境");
    }

    // 选择消息存储：配置了数据库则持久化，否则使用内存存储
    let store: Arc<dyn MessageStore> = match &config.database.url {
        Some(url) => {
            tracing::info!(
                database = url.split('@').last().unwrap_or("unknown"),
                "连接数据库"
            );
            let pool = create_pg_pool(url, config.database.max_connections).await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            Arc::new(PgMessageStore::new(pool))
        }
        None => {
            tracing::warn!("未配置 DATABASE_URL，消息仅保存在内存中");
            Arc::new(MemoryMessageStore::new())
        }
    };

    let presence = Arc::new(PresenceRegistry::new());
    let rate_limiter = Arc::new(RateLimiter::from_config(&config.chat));

    // 周期清理过期的限流窗口。认证类按出示的凭证字符串计数，
    // 不清理的话每个无效凭证都会留下一条永久记录。
    // 清理保留不超过两个窗口的记录，按最长的窗口（认证）扫一遍即可。
    {
        let rate_limiter = rate_limiter.clone();
        let sweep_interval = Duration::from_secs(config.chat.auth_window_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                rate_limiter.cleanup_expired();
            }
        });
    }
    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        store,
        presence: presence.clone(),
        rate_limiter: rate_limiter.clone(),
        max_content_chars: config.chat.max_content_chars,
    }));

    let session_validator: Arc<dyn SessionValidator> = Arc::new(JwtService::new(&config.jwt));

    let state = AppState::new(
        chat_service,
        presence,
        rate_limiter,
        session_validator,
        config.chat.clone(),
    );

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

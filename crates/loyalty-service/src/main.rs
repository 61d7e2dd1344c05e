//! 酒店会员积分服务入口

use std::sync::Arc;

use loyalty_engine::LoyaltyService;
use loyalty_engine::repository::{
    AccountRepository, MIGRATOR, MemoryAccountRepository, MemoryReferralRepository,
    PgAccountRepository, PgReferralRepository, ReferralRepository,
};
use loyalty_engine::worker::ExpiryWorker;
use loyalty_service::{AppState, ServiceConfig, config::SERVICE_NAME, routes};
use loyalty_shared::config::StorageBackend;
use loyalty_shared::database::Database;
use loyalty_shared::observability;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load()?;

    let obs_config = config
        .app
        .observability
        .clone()
        .with_service_name(&config.app.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.app.environment,
        backend = ?config.app.storage.backend,
        "Starting {} on {}",
        SERVICE_NAME,
        config.app.server_addr()
    );

    let (accounts, referrals, database) = build_repositories(&config).await?;

    let service = Arc::new(LoyaltyService::new(
        accounts,
        referrals,
        config.loyalty.clone(),
    )?);

    if config.worker.enabled {
        let worker = ExpiryWorker::from_config(service.clone(), &config.worker);
        tokio::spawn(async move {
            worker.run().await;
        });
    } else {
        warn!("Expiry worker disabled");
    }

    let app = routes::app(AppState::new(service));

    let listener = TcpListener::bind(config.app.server_addr()).await?;
    info!("Listening on {}", config.app.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server shutdown complete");

    Ok(())
}

type Repositories = (
    Arc<dyn AccountRepository>,
    Arc<dyn ReferralRepository>,
    Option<Database>,
);

/// 按 storage.backend 选择存储实现
async fn build_repositories(config: &ServiceConfig) -> anyhow::Result<Repositories> {
    match config.app.storage.backend {
        StorageBackend::Memory => {
            if config.app.is_production() {
                warn!("生产环境使用内存存储，重启后数据将丢失");
            }
            let accounts: Arc<dyn AccountRepository> = Arc::new(MemoryAccountRepository::new());
            let referrals: Arc<dyn ReferralRepository> = Arc::new(MemoryReferralRepository::new());
            Ok((accounts, referrals, None))
        }
        StorageBackend::Postgres => {
            let db = Database::connect(&config.app.database).await?;
            db.run_migrations(&MIGRATOR).await?;
            let latency = db.health_check().await?;
            info!(latency_ms = latency.as_millis() as u64, "PostgreSQL storage ready");
            let accounts: Arc<dyn AccountRepository> =
                Arc::new(PgAccountRepository::new(db.pool().clone()));
            let referrals: Arc<dyn ReferralRepository> =
                Arc::new(PgReferralRepository::new(db.pool().clone()));
            Ok((accounts, referrals, Some(db)))
        }
    }
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

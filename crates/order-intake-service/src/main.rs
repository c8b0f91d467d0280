//! 下单服务
//!
//! 受理下单请求并发布到 Kafka，提供订单查询与经营分析 API。

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, routing::get};
use order_intake::{
    AnalyticsService, KafkaEventPublisher, OrderIntake, RecentOrdersCache,
    repository::{AnalyticsRepository, OrderQueryRepository},
    routes,
    state::AppState,
};
use order_shared::{
    cache::Cache, config::AppConfig, database::Database, kafka::KafkaProducer, observability,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "order-intake-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        AppConfig::default()
    });

    let obs_config = config.observability.clone().with_service_name(SERVICE_NAME);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    // 表结构由订单处理服务迁移，这里只读
    let db = Database::connect(&config.database).await?;

    let cache = Cache::new(&config.redis)?;
    if let Err(e) = cache.health_check().await {
        warn!(error = %e, "Redis 暂不可用，近期订单将直接查询数据库");
    }

    let producer = KafkaProducer::new(&config.kafka)?;

    let order_repo = Arc::new(OrderQueryRepository::new(db.pool().clone()));
    let analytics_repo = Arc::new(AnalyticsRepository::new(db.pool().clone()));

    let recent = Arc::new(RecentOrdersCache::new(
        Arc::new(cache.clone()),
        order_repo.clone(),
    ));
    let intake = Arc::new(OrderIntake::new(
        Arc::new(KafkaEventPublisher::new(producer.clone())),
        recent.clone(),
    ));

    let state = AppState {
        intake,
        recent,
        orders: order_repo,
        analytics: Arc::new(AnalyticsService::new(analytics_repo)),
    };

    let app = routes::app(state)
        .merge(probe_routes(db.clone(), cache))
        .layer(cors());

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 按获取的逆序释放：先把未发送的事件刷出，再关闭连接池
    if let Err(e) = producer.flush(Duration::from_secs(5)) {
        warn!(error = %e, "关闭前刷新 Kafka 生产者失败");
    }
    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

fn probe_routes(db: Database, cache: Cache) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/ready",
            get(move || readiness_check(db.clone(), cache.clone())),
        )
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查 PostgreSQL 与 Redis
async fn readiness_check(db: Database, cache: Cache) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();
    let redis_ok = cache.health_check().await.is_ok();

    Json(serde_json::json!({
        "status": if db_ok && redis_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "redis": if redis_ok { "ok" } else { "fail" }
        }
    }))
}

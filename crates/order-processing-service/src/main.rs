//! 订单处理服务
//!
//! 启动 Kafka 下单事件消费循环，并提供同步下单与订单查询 API。

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use order_processing::{
    ConsumerLiveness, ItemPriceResolver, OrderEventConsumer, OrderMaterializer,
    repository::{ItemRepository, OrderRepository},
    routes,
    state::AppState,
};
use order_shared::{config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tokio::sync::watch;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "order-processing-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        AppConfig::default()
    });

    let obs_config = config.observability.clone().with_service_name(SERVICE_NAME);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    // 初始化基础设施：连接在进程内只建立一次，注入各组件
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;

    let item_repo = Arc::new(ItemRepository::new(db.pool().clone()));
    let order_repo = Arc::new(OrderRepository::new(db.pool().clone()));

    let materializer = Arc::new(OrderMaterializer::new(
        ItemPriceResolver::new(item_repo),
        order_repo.clone(),
    ));

    // 消费循环作为独立任务运行，通过 watch channel 通知退出
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = OrderEventConsumer::new(&config.kafka, materializer.clone())?;
    let liveness = ConsumerLiveness::new();
    let guard = liveness.enter();
    let consumer_handle = tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = consumer.run(shutdown_rx).await {
            error!(error = %e, "下单事件消费者异常退出");
        }
    });

    let state = AppState::new(materializer, order_repo);

    let app = routes::app(state)
        .merge(probe_routes(db.clone(), liveness))
        .layer(cors());

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 先停消费者，等待进行中的物化完成，再关闭连接池
    let _ = shutdown_tx.send(true);
    if let Err(e) = consumer_handle.await {
        warn!(error = %e, "等待消费者退出失败");
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

fn probe_routes(db: Database, liveness: ConsumerLiveness) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/ready",
            get(move || readiness_check(db.clone(), liveness.clone())),
        )
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
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

/// 就绪探针：检查数据库连接与消费循环是否存活
async fn readiness_check(db: Database, liveness: ConsumerLiveness) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();
    let consumer_ok = liveness.is_alive();

    Json(serde_json::json!({
        "status": if db_ok && consumer_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "consumer": if consumer_ok { "ok" } else { "fail" }
        }
    }))
}

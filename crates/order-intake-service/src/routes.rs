//! 路由配置

use axum::{
    Router, middleware,
    routing::{get, post},
};
use order_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

/// 下单与订单查询
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(handlers::orders::submit_order))
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/recent", get(handlers::orders::recent_orders))
}

/// 经营分析
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/analytics/daily-aggregates",
            get(handlers::analytics::daily_aggregates),
        )
        .route(
            "/analytics/popular-items",
            get(handlers::analytics::popular_items),
        )
}

/// 组装完整的应用路由（不含探针）
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(order_routes())
        .merge(analytics_routes())
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

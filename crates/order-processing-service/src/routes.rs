//! 路由配置

use axum::{
    Router, middleware,
    routing::{get, post},
};
use order_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

/// 订单相关路由
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(handlers::create_order))
        .route("/orders", get(handlers::list_orders))
        .route("/orders/{id}", get(handlers::get_order))
}

/// 组装完整的应用路由（不含探针）
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(order_routes())
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

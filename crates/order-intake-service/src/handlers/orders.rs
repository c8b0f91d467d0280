//! 订单 API 处理器

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use order_shared::events::parse_restaurant_id;
use tracing::instrument;
use validator::Validate;

use super::restaurant_header;
use crate::dto::CreateOrderRequest;
use crate::error::IntakeError;
use crate::intake::Accepted;
use crate::recent_cache::ListOrdersResponse;
use crate::state::AppState;

/// 提交订单，事件入队后立即返回
///
/// POST /orders
#[instrument(skip(state, headers, req))]
pub async fn submit_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Accepted>), IntakeError> {
    let restaurant = restaurant_header(&headers)?;
    req.validate()?;

    let accepted = state
        .intake
        .submit(&restaurant, req.into_event_items())
        .await?;

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// 餐厅全部订单
///
/// GET /orders
#[instrument(skip(state, headers))]
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListOrdersResponse>, IntakeError> {
    let restaurant_id = parse_restaurant_id(&restaurant_header(&headers)?)?;
    let orders = state.orders.list_by_restaurant(restaurant_id).await?;
    Ok(Json(ListOrdersResponse::from_database(orders)))
}

/// 近 15 分钟的订单，优先读缓存
///
/// GET /orders/recent
#[instrument(skip(state, headers))]
pub async fn recent_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListOrdersResponse>, IntakeError> {
    let restaurant_id = parse_restaurant_id(&restaurant_header(&headers)?)?;
    let response = state.recent.get(restaurant_id).await?;
    Ok(Json(response))
}

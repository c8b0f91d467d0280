//! 订单 API 处理器
//!
//! 同步下单与订单查询。同步下单和事件消费走同一个 OrderMaterializer。

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use order_shared::error::OrderError;
use order_shared::events::OrderEvent;
use order_shared::models::Order;
use tracing::instrument;
use uuid::Uuid;

use crate::dto::{ApiResponse, CreateOrderRequest, CreatedOrder, ListOrdersQuery};
use crate::error::ProcessingError;
use crate::materializer::{NewOrder, OrderSource};
use crate::state::AppState;

/// 标识餐厅的请求头
pub const ORG_HEADER: &str = "x-org";

fn restaurant_header(headers: &HeaderMap) -> Result<String, ProcessingError> {
    headers
        .get(ORG_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ProcessingError::MissingHeader(ORG_HEADER))
}

/// 同步下单
///
/// POST /orders
#[instrument(skip(state, headers, req))]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedOrder>>), ProcessingError> {
    let restaurant = restaurant_header(&headers)?;
    let validated = OrderEvent::new(restaurant, req.items).validate()?;

    let order = state
        .materializer
        .create_order(
            NewOrder::new(validated.restaurant_id, validated.line_items),
            OrderSource::Api,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedOrder { id: order.id })),
    ))
}

/// 最近订单
///
/// GET /orders?limit=20
#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ProcessingError> {
    let orders = state.orders.list_recent(query.limit()).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// 订单详情
///
/// GET /orders/{id}
#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ProcessingError> {
    let id = Uuid::parse_str(&id).map_err(|_| OrderError::invalid("id", "订单 ID 格式无效"))?;

    let order = state
        .orders
        .get_order(id)
        .await?
        .ok_or(ProcessingError::OrderNotFound(id))?;

    Ok(Json(ApiResponse::success(order)))
}

//! 经营分析处理器

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use order_shared::models::{DailyAggregate, PopularItem};
use tracing::instrument;

use super::restaurant_header;
use crate::analytics::{DailyAggregatesQuery, DateRangeParams, PopularItemsQuery};
use crate::error::IntakeError;
use crate::state::AppState;

/// 餐厅日聚合
///
/// GET /analytics/daily-aggregates?from=MM/DD/YYYY&to=MM/DD/YYYY
#[instrument(skip(state, headers))]
pub async fn daily_aggregates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<Vec<DailyAggregate>>, IntakeError> {
    let query = DailyAggregatesQuery::parse(&restaurant_header(&headers)?, &params)?;
    let rows = state.analytics.daily_aggregates(query).await?;
    Ok(Json(rows))
}

/// 热门商品
///
/// GET /analytics/popular-items?from=MM/DD/YYYY&to=MM/DD/YYYY
#[instrument(skip(state))]
pub async fn popular_items(
    State(state): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<Vec<PopularItem>>, IntakeError> {
    let query = PopularItemsQuery::parse(&params)?;
    let rows = state.analytics.popular_items(query).await?;
    Ok(Json(rows))
}

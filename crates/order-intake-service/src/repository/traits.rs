//! 仓储 Trait 定义
//!
//! 下单服务对订单库只读，写入全部由订单处理服务完成。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use order_shared::error::Result;
use order_shared::models::{DailyAggregate, Order, PopularItem};
use uuid::Uuid;

/// 订单查询接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderQueryRepositoryTrait: Send + Sync {
    /// 餐厅的全部订单，按创建时间倒序
    async fn list_by_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>>;

    /// 餐厅在 since 之后（含）创建的订单，按创建时间倒序
    async fn list_since(&self, restaurant_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Order>>;
}

/// 分析查询接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsRepositoryTrait: Send + Sync {
    /// 日聚合，day ∈ [from, to_exclusive)，按日期升序
    async fn daily_aggregates(
        &self,
        restaurant_id: Uuid,
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<DailyAggregate>>;

    /// 热门商品，订单创建时间 ∈ [start, end)，按销量降序、营收降序
    async fn popular_items(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PopularItem>>;
}

//! 分析查询仓储
//!
//! 日聚合直接读 daily_aggregates；热门商品从订单明细实时汇总。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use order_shared::error::Result;
use order_shared::models::{DailyAggregate, PopularItem};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::traits::AnalyticsRepositoryTrait;

pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn daily_aggregates(
        &self,
        restaurant_id: Uuid,
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        let rows = sqlx::query_as::<_, DailyAggregate>(
            r#"
            SELECT restaurant_id, day, total_orders, revenue
            FROM daily_aggregates
            WHERE restaurant_id = $1 AND day >= $2 AND day < $3
            ORDER BY day ASC
            "#,
        )
        .bind(restaurant_id)
        .bind(from)
        .bind(to_exclusive)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// 营收按商品当前价格计算，而不是下单时冻结的价格；目录中已不存在的商品不参与排名
    #[instrument(skip(self))]
    pub async fn popular_items(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PopularItem>> {
        let rows = sqlx::query_as::<_, PopularItem>(
            r#"
            SELECT oi.item_id,
                   i.name,
                   SUM(oi.quantity)::BIGINT AS quantity,
                   i.price * SUM(oi.quantity) AS revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN items i ON i.id = oi.item_id
            WHERE o.created_at >= $1 AND o.created_at < $2
            GROUP BY oi.item_id, i.name, i.price
            ORDER BY quantity DESC, revenue DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl AnalyticsRepositoryTrait for AnalyticsRepository {
    async fn daily_aggregates(
        &self,
        restaurant_id: Uuid,
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        self.daily_aggregates(restaurant_id, from, to_exclusive)
            .await
    }

    async fn popular_items(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PopularItem>> {
        self.popular_items(start, end).await
    }
}

//! 订单查询仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use order_shared::error::Result;
use order_shared::models::{Order, OrderItemRow, OrderRow, assemble_orders};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::traits::OrderQueryRepositoryTrait;

pub struct OrderQueryRepository {
    pool: PgPool,
}

impl OrderQueryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn list_by_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, restaurant_id, total_price, total_cost, created_at
            FROM orders
            WHERE restaurant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(rows).await
    }

    #[instrument(skip(self))]
    pub async fn list_since(
        &self,
        restaurant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, restaurant_id, total_price, total_cost, created_at
            FROM orders
            WHERE restaurant_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(restaurant_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(rows).await
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, position, item_id, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_orders(rows, items))
    }
}

#[async_trait]
impl OrderQueryRepositoryTrait for OrderQueryRepository {
    async fn list_by_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>> {
        self.list_by_restaurant(restaurant_id).await
    }

    async fn list_since(&self, restaurant_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Order>> {
        self.list_since(restaurant_id, since).await
    }
}

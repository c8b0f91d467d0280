//! 订单仓储
//!
//! 订单写入后不再修改；日聚合只通过单条 upsert 语句递增，不做先读后写。

use async_trait::async_trait;
use chrono::NaiveDate;
use order_shared::error::Result;
use order_shared::models::{Order, OrderItemRow, OrderRow, assemble_orders};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::traits::OrderRepositoryTrait;

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 写入订单与明细，任一语句失败则整体回滚
    #[instrument(skip(self, order), fields(order_id = %order.id, restaurant_id = %order.restaurant_id))]
    pub async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, restaurant_id, total_price, total_cost, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id)
        .bind(order.restaurant_id)
        .bind(order.total_price)
        .bind(order.total_cost)
        .bind(order.creation_date)
        .execute(&mut *tx)
        .await?;

        Self::insert_items_in_tx(&mut tx, order).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_items_in_tx(tx: &mut PgConnection, order: &Order) -> Result<()> {
        for (position, line) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, item_id, quantity)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order.id)
            .bind(position as i32)
            .bind(line.item_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn increment_daily_aggregate(
        &self,
        restaurant_id: Uuid,
        day: NaiveDate,
        revenue: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_aggregates (restaurant_id, day, total_orders, revenue)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (restaurant_id, day) DO UPDATE
            SET total_orders = daily_aggregates.total_orders + 1,
                revenue = daily_aggregates.revenue + EXCLUDED.revenue
            "#,
        )
        .bind(restaurant_id)
        .bind(day)
        .bind(revenue)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, restaurant_id, total_price, total_cost, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self.load_items(&[row.id]).await?;
        Ok(assemble_orders(vec![row], items).pop())
    }

    #[instrument(skip(self))]
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, restaurant_id, total_price, total_cost, created_at
            FROM orders
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = self.load_items(&ids).await?;
        Ok(assemble_orders(rows, items))
    }

    async fn load_items(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItemRow>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, position, item_id, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.insert_order(order).await
    }

    async fn increment_daily_aggregate(
        &self,
        restaurant_id: Uuid,
        day: NaiveDate,
        revenue: f64,
    ) -> Result<()> {
        self.increment_daily_aggregate(restaurant_id, day, revenue)
            .await
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        self.get_order(id).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>> {
        self.list_recent(limit).await
    }
}

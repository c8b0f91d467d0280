//! 商品目录仓储

use async_trait::async_trait;
use order_shared::error::Result;
use order_shared::models::Item;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::traits::ItemRepositoryTrait;

pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, restaurant_id, name, price, cost
            FROM items
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[async_trait]
impl ItemRepositoryTrait for ItemRepository {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Item>> {
        self.find_by_ids(ids).await
    }
}

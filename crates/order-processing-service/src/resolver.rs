//! 商品价格解析

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use order_shared::error::Result;
use order_shared::models::ItemPrice;
use tracing::debug;
use uuid::Uuid;

use crate::repository::ItemRepositoryTrait;

/// 商品价格解析器
///
/// 重复 ID 只查询一次；目录中不存在的 ID 不出现在结果中，由调用方决定如何处理。
pub struct ItemPriceResolver {
    items: Arc<dyn ItemRepositoryTrait>,
}

impl ItemPriceResolver {
    pub fn new(items: Arc<dyn ItemRepositoryTrait>) -> Self {
        Self { items }
    }

    pub async fn resolve(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ItemPrice>> {
        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let items = self.items.find_by_ids(&unique).await?;

        debug!(
            requested = unique.len(),
            resolved = items.len(),
            "商品价格解析完成"
        );

        Ok(items
            .iter()
            .map(|item| (item.id, ItemPrice::from(item)))
            .collect())
    }
}

//! 集成测试公共设施：内存版商品目录与订单存储

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use order_processing::repository::{ItemRepositoryTrait, OrderRepositoryTrait};
use order_processing::{ItemPriceResolver, OrderMaterializer};
use order_shared::error::{OrderError, Result};
use order_shared::models::{DailyAggregate, Item, Order};
use uuid::Uuid;

/// 内存存储
///
/// 日聚合通过 DashMap entry 原地累加，与数据库 upsert 一样不存在先读后写。
#[derive(Default)]
pub struct InMemoryStore {
    items: DashMap<Uuid, Item>,
    orders: DashMap<Uuid, Order>,
    aggregates: DashMap<(Uuid, NaiveDate), DailyAggregate>,
    fail_aggregates: AtomicBool,
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_item(&self, item: Item) {
        self.items.insert(item.id, item);
    }

    pub fn fail_aggregate_updates(&self) {
        self.fail_aggregates.store(true, Ordering::SeqCst);
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn orders_for(&self, restaurant_id: Uuid) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.restaurant_id == restaurant_id)
            .map(|o| o.clone())
            .collect()
    }

    pub fn aggregate(&self, restaurant_id: Uuid, day: NaiveDate) -> Option<DailyAggregate> {
        self.aggregates.get(&(restaurant_id, day)).map(|a| a.clone())
    }

    pub fn materializer(self: &Arc<Self>) -> OrderMaterializer {
        OrderMaterializer::new(ItemPriceResolver::new(self.clone()), self.clone())
    }
}

#[async_trait]
impl ItemRepositoryTrait for InMemoryStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Item>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|i| i.clone()))
            .collect())
    }
}

#[async_trait]
impl OrderRepositoryTrait for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn increment_daily_aggregate(
        &self,
        restaurant_id: Uuid,
        day: NaiveDate,
        revenue: f64,
    ) -> Result<()> {
        if self.fail_aggregates.load(Ordering::SeqCst) {
            return Err(OrderError::Internal("聚合表不可用".to_string()));
        }

        // 让出调度，放大并发交错
        tokio::task::yield_now().await;

        let mut entry = self
            .aggregates
            .entry((restaurant_id, day))
            .or_insert_with(|| DailyAggregate {
                restaurant_id,
                day,
                total_orders: 0,
                revenue: 0.0,
            });
        entry.total_orders += 1;
        entry.revenue += revenue;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.orders.iter().map(|o| o.clone()).collect();
        orders.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        orders.truncate(limit as usize);
        Ok(orders)
    }
}

/// 按名称索引的测试商品
#[allow(dead_code)]
pub fn seed_items(store: &InMemoryStore, restaurant_id: Uuid, items: &[(&str, f64, f64)]) -> HashMap<String, Uuid> {
    items
        .iter()
        .map(|(name, price, cost)| {
            let item = order_shared::test_utils::TestDataGenerator::item(restaurant_id, name, *price, *cost);
            let id = item.id;
            store.add_item(item);
            (name.to_string(), id)
        })
        .collect()
}

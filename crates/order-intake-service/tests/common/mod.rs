//! 集成测试公共设施：内存版订单库与事件发布器

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use order_intake::repository::{AnalyticsRepositoryTrait, OrderQueryRepositoryTrait};
use order_intake::state::AppState;
use order_intake::{AnalyticsService, OrderEventPublisher, OrderIntake, RecentOrdersCache};
use order_shared::error::{OrderError, Result};
use order_shared::events::OrderEvent;
use order_shared::models::{DailyAggregate, Item, Order, PopularItem};
use order_shared::test_utils::MemoryCache;
use uuid::Uuid;

/// 内存订单库，记录 list_since 的调用次数以区分缓存命中
#[derive(Default)]
pub struct InMemoryOrders {
    items: DashMap<Uuid, Item>,
    orders: DashMap<Uuid, Order>,
    aggregates: DashMap<(Uuid, NaiveDate), DailyAggregate>,
    recent_reads: AtomicUsize,
}

#[allow(dead_code)]
impl InMemoryOrders {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_item(&self, item: Item) {
        self.items.insert(item.id, item);
    }

    pub fn add_order(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn add_aggregate(&self, aggregate: DailyAggregate) {
        self.aggregates
            .insert((aggregate.restaurant_id, aggregate.day), aggregate);
    }

    pub fn recent_reads(&self) -> usize {
        self.recent_reads.load(Ordering::SeqCst)
    }

    fn sorted_desc(&self, filter: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| filter(o))
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        orders
    }
}

#[async_trait]
impl OrderQueryRepositoryTrait for InMemoryOrders {
    async fn list_by_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>> {
        Ok(self.sorted_desc(|o| o.restaurant_id == restaurant_id))
    }

    async fn list_since(&self, restaurant_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Order>> {
        self.recent_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.sorted_desc(|o| o.restaurant_id == restaurant_id && o.creation_date >= since))
    }
}

#[async_trait]
impl AnalyticsRepositoryTrait for InMemoryOrders {
    async fn daily_aggregates(
        &self,
        restaurant_id: Uuid,
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        let mut rows: Vec<DailyAggregate> = self
            .aggregates
            .iter()
            .filter(|a| a.restaurant_id == restaurant_id && a.day >= from && a.day < to_exclusive)
            .map(|a| a.clone())
            .collect();
        rows.sort_by_key(|a| a.day);
        Ok(rows)
    }

    async fn popular_items(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PopularItem>> {
        let mut quantities: HashMap<Uuid, i64> = HashMap::new();
        for order in self.orders.iter() {
            if order.creation_date < start || order.creation_date >= end {
                continue;
            }
            for line in &order.items {
                *quantities.entry(line.item_id).or_default() += i64::from(line.quantity);
            }
        }

        let mut rows: Vec<PopularItem> = quantities
            .into_iter()
            .filter_map(|(item_id, quantity)| {
                self.items.get(&item_id).map(|item| PopularItem {
                    item_id,
                    name: item.name.clone(),
                    quantity,
                    revenue: item.price * quantity as f64,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then(b.revenue.total_cmp(&a.revenue))
        });
        Ok(rows)
    }
}

/// 记录已发布事件的发布器，可切换为故障模式
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<OrderEvent>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderEventPublisher for RecordingPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(OrderError::Kafka("Local: Message timed out".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// 一套完整的内存版服务依赖
#[allow(dead_code)]
pub struct TestHarness {
    pub orders: Arc<InMemoryOrders>,
    pub cache: Arc<MemoryCache>,
    pub publisher: Arc<RecordingPublisher>,
    pub state: AppState,
}

impl TestHarness {
    pub fn new() -> Self {
        let orders = InMemoryOrders::new();
        let cache = Arc::new(MemoryCache::new());
        let publisher = RecordingPublisher::new();

        let recent = Arc::new(RecentOrdersCache::new(cache.clone(), orders.clone()));
        let intake = Arc::new(OrderIntake::new(publisher.clone(), recent.clone()));

        let state = AppState {
            intake,
            recent,
            orders: orders.clone(),
            analytics: Arc::new(AnalyticsService::new(orders.clone())),
        };

        Self {
            orders,
            cache,
            publisher,
            state,
        }
    }
}

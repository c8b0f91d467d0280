//! 订单物化
//!
//! 解析价格、计算总价与总成本、持久化订单，并递增所属日聚合。
//! 事件消费与同步 HTTP 下单共用同一条路径。

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use order_shared::error::{OrderError, Result};
use order_shared::models::{ItemPrice, Order, OrderLineItem};
use order_shared::observability::metrics;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::repository::OrderRepositoryTrait;
use crate::resolver::ItemPriceResolver;

/// 订单来源，用于指标标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    Event,
    Api,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Api => "api",
        }
    }
}

/// 待物化的订单
///
/// `id` 与 `created_at` 为空时由物化器补齐。
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Option<Uuid>,
    pub restaurant_id: Uuid,
    pub line_items: Vec<OrderLineItem>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewOrder {
    pub fn new(restaurant_id: Uuid, line_items: Vec<OrderLineItem>) -> Self {
        Self {
            id: None,
            restaurant_id,
            line_items,
            created_at: None,
        }
    }
}

/// 订单物化器
pub struct OrderMaterializer {
    resolver: ItemPriceResolver,
    orders: Arc<dyn OrderRepositoryTrait>,
}

impl OrderMaterializer {
    pub fn new(resolver: ItemPriceResolver, orders: Arc<dyn OrderRepositoryTrait>) -> Self {
        Self { resolver, orders }
    }

    /// 物化一条来自事件的订单，返回新订单 ID
    pub async fn materialize(
        &self,
        restaurant_id: Uuid,
        line_items: Vec<OrderLineItem>,
    ) -> Result<Uuid> {
        let order = self
            .create_order(NewOrder::new(restaurant_id, line_items), OrderSource::Event)
            .await?;
        Ok(order.id)
    }

    /// 物化订单
    ///
    /// 订单写入失败时整体失败；日聚合更新失败只记录日志和指标，订单仍然成功。
    #[instrument(skip(self, new_order), fields(restaurant_id = %new_order.restaurant_id, source = source.as_str()))]
    pub async fn create_order(&self, new_order: NewOrder, source: OrderSource) -> Result<Order> {
        let start = Instant::now();

        let result = self.price_and_persist(new_order).await;

        let status = if result.is_ok() { "success" } else { "failed" };
        metrics::record_order_materialized(source.as_str(), status, start.elapsed().as_secs_f64());

        let order = result?;

        if let Err(e) = self
            .orders
            .increment_daily_aggregate(order.restaurant_id, order.aggregate_day(), order.total_price)
            .await
        {
            metrics::record_aggregate_failure();
            error!(
                order_id = %order.id,
                restaurant_id = %order.restaurant_id,
                day = %order.aggregate_day(),
                revenue = order.total_price,
                error = %e,
                "日聚合更新失败，需通过已持久化订单重放修复"
            );
        }

        info!(
            order_id = %order.id,
            total_price = order.total_price,
            total_cost = order.total_cost,
            items = order.items.len(),
            "订单已物化"
        );

        Ok(order)
    }

    async fn price_and_persist(&self, new_order: NewOrder) -> Result<Order> {
        check_preconditions(&new_order.line_items)?;

        let ids: Vec<Uuid> = new_order.line_items.iter().map(|l| l.item_id).collect();
        let prices = self.resolver.resolve(&ids).await?;

        let totals = compute_totals(&new_order.line_items, |id| prices.get(id).copied());

        if !totals.unresolved.is_empty() {
            metrics::record_unresolved_items(totals.unresolved.len());
            warn!(
                restaurant_id = %new_order.restaurant_id,
                unresolved = ?totals.unresolved,
                "部分商品无法解析价格，按 0 计入总价"
            );
        }

        let order = Order {
            id: new_order.id.unwrap_or_else(Uuid::now_v7),
            restaurant_id: new_order.restaurant_id,
            total_price: totals.price,
            total_cost: totals.cost,
            creation_date: new_order.created_at.unwrap_or_else(Utc::now),
            items: new_order.line_items,
        };

        self.orders.insert_order(&order).await?;

        Ok(order)
    }
}

fn check_preconditions(line_items: &[OrderLineItem]) -> Result<()> {
    if line_items.is_empty() {
        return Err(OrderError::invalid("items", "至少需要一个商品"));
    }

    for (idx, line) in line_items.iter().enumerate() {
        if line.item_id.is_nil() {
            return Err(OrderError::invalid(format!("items[{idx}]"), "商品 ID 不能为空"));
        }
        if line.quantity <= 0 {
            return Err(OrderError::invalid(format!("items[{idx}]"), "数量必须大于 0"));
        }
    }

    Ok(())
}

/// 订单金额汇总
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub price: f64,
    pub cost: f64,
    /// 无法解析的商品 ID，按出现顺序去重
    pub unresolved: Vec<Uuid>,
}

/// 按 数量 × 单价 汇总订单金额，无法解析的商品贡献为 0
pub fn compute_totals<F>(line_items: &[OrderLineItem], lookup: F) -> Totals
where
    F: Fn(&Uuid) -> Option<ItemPrice>,
{
    let mut totals = Totals {
        price: 0.0,
        cost: 0.0,
        unresolved: Vec::new(),
    };

    for line in line_items {
        match lookup(&line.item_id) {
            Some(p) => {
                let qty = f64::from(line.quantity);
                totals.price += qty * p.price;
                totals.cost += qty * p.cost;
            }
            None => {
                if !totals.unresolved.contains(&line.item_id) {
                    totals.unresolved.push(line.item_id);
                }
            }
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockItemRepositoryTrait, MockOrderRepositoryTrait};
    use order_shared::models::Item;

    fn line(item_id: Uuid, quantity: i32) -> OrderLineItem {
        OrderLineItem { item_id, quantity }
    }

    fn catalog(items: Vec<Item>) -> ItemPriceResolver {
        let mut repo = MockItemRepositoryTrait::new();
        repo.expect_find_by_ids().returning(move |ids| {
            Ok(items
                .iter()
                .filter(|item| ids.contains(&item.id))
                .cloned()
                .collect())
        });
        ItemPriceResolver::new(Arc::new(repo))
    }

    fn item(price: f64, cost: f64) -> Item {
        Item {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: "item".to_string(),
            price,
            cost,
        }
    }

    #[test]
    fn test_compute_totals_worked_example() {
        let i1 = Uuid::new_v4();
        let i2 = Uuid::new_v4();
        let totals = compute_totals(&[line(i1, 2), line(i2, 1)], |id| {
            if *id == i1 {
                Some(ItemPrice { price: 15.0, cost: 10.5 })
            } else if *id == i2 {
                Some(ItemPrice { price: 5.0, cost: 3.0 })
            } else {
                None
            }
        });

        assert_eq!(totals.price, 35.0);
        assert_eq!(totals.cost, 24.0);
        assert!(totals.unresolved.is_empty());
    }

    #[test]
    fn test_compute_totals_unresolved_contributes_zero() {
        let missing = Uuid::new_v4();
        let totals = compute_totals(&[line(missing, 3), line(missing, 1)], |_| None);

        assert_eq!(totals.price, 0.0);
        assert_eq!(totals.cost, 0.0);
        assert_eq!(totals.unresolved, vec![missing]);
    }

    #[tokio::test]
    async fn test_materialize_persists_and_increments_aggregate() {
        let burger = item(15.0, 10.5);
        let fries = item(5.0, 3.0);
        let restaurant_id = Uuid::new_v4();
        let lines = vec![line(burger.id, 2), line(fries.id, 1)];

        let mut orders = MockOrderRepositoryTrait::new();
        orders
            .expect_insert_order()
            .withf(move |order| {
                order.restaurant_id == restaurant_id
                    && order.total_price == 35.0
                    && order.total_cost == 24.0
                    && order.items.len() == 2
            })
            .times(1)
            .returning(|_| Ok(()));
        orders
            .expect_increment_daily_aggregate()
            .withf(move |rid, day, revenue| {
                *rid == restaurant_id && *day == Utc::now().date_naive() && *revenue == 35.0
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let materializer = OrderMaterializer::new(catalog(vec![burger, fries]), Arc::new(orders));
        let id = materializer.materialize(restaurant_id, lines).await.unwrap();
        assert!(!id.is_nil());
    }

    #[tokio::test]
    async fn test_create_order_keeps_supplied_identity() {
        let burger = item(12.5, 7.1);
        let order_id = Uuid::new_v4();
        let created_at = Utc::now() - chrono::Duration::days(1);

        let mut orders = MockOrderRepositoryTrait::new();
        orders.expect_insert_order().returning(|_| Ok(()));
        orders
            .expect_increment_daily_aggregate()
            .withf(move |_, day, _| *day == created_at.date_naive())
            .returning(|_, _, _| Ok(()));

        let materializer = OrderMaterializer::new(catalog(vec![burger.clone()]), Arc::new(orders));
        let new_order = NewOrder {
            id: Some(order_id),
            restaurant_id: Uuid::new_v4(),
            line_items: vec![line(burger.id, 1)],
            created_at: Some(created_at),
        };

        let order = materializer
            .create_order(new_order, OrderSource::Api)
            .await
            .unwrap();
        assert_eq!(order.id, order_id);
        assert_eq!(order.creation_date, created_at);
    }

    #[tokio::test]
    async fn test_unresolved_item_is_zero_priced_not_rejected() {
        let burger = item(12.5, 7.1);
        let lines = vec![line(burger.id, 2), line(Uuid::new_v4(), 4)];

        let mut orders = MockOrderRepositoryTrait::new();
        orders
            .expect_insert_order()
            .withf(|order| order.total_price == 25.0 && order.items.len() == 2)
            .times(1)
            .returning(|_| Ok(()));
        orders
            .expect_increment_daily_aggregate()
            .returning(|_, _, _| Ok(()));

        let materializer = OrderMaterializer::new(catalog(vec![burger]), Arc::new(orders));
        assert!(materializer.materialize(Uuid::new_v4(), lines).await.is_ok());
    }

    #[tokio::test]
    async fn test_persist_failure_aborts_without_aggregate() {
        let burger = item(12.5, 7.1);

        let mut orders = MockOrderRepositoryTrait::new();
        orders
            .expect_insert_order()
            .returning(|_| Err(OrderError::Database(sqlx::Error::PoolTimedOut)));
        orders.expect_increment_daily_aggregate().never();

        let materializer = OrderMaterializer::new(catalog(vec![burger.clone()]), Arc::new(orders));
        let err = materializer
            .materialize(Uuid::new_v4(), vec![line(burger.id, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Database(_)));
    }

    #[tokio::test]
    async fn test_aggregate_failure_is_not_fatal() {
        let burger = item(12.5, 7.1);

        let mut orders = MockOrderRepositoryTrait::new();
        orders.expect_insert_order().times(1).returning(|_| Ok(()));
        orders
            .expect_increment_daily_aggregate()
            .times(1)
            .returning(|_, _, _| Err(OrderError::Database(sqlx::Error::PoolClosed)));

        let materializer = OrderMaterializer::new(catalog(vec![burger.clone()]), Arc::new(orders));
        assert!(
            materializer
                .materialize(Uuid::new_v4(), vec![line(burger.id, 1)])
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_preconditions_checked_before_any_io() {
        let mut items = MockItemRepositoryTrait::new();
        items.expect_find_by_ids().never();
        let mut orders = MockOrderRepositoryTrait::new();
        orders.expect_insert_order().never();

        let materializer =
            OrderMaterializer::new(ItemPriceResolver::new(Arc::new(items)), Arc::new(orders));

        assert!(materializer.materialize(Uuid::new_v4(), vec![]).await.is_err());
        assert!(
            materializer
                .materialize(Uuid::new_v4(), vec![line(Uuid::new_v4(), 0)])
                .await
                .is_err()
        );
        assert!(
            materializer
                .materialize(Uuid::new_v4(), vec![line(Uuid::nil(), 1)])
                .await
                .is_err()
        );
    }
}

//! 订单领域模型
//!
//! 请求处理进程与事件消费进程共用的实体定义，字段以 camelCase 对外序列化。

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 订单行
///
/// 不具备独立生命周期，归属于唯一一个订单。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    #[serde(rename = "id")]
    pub item_id: Uuid,
    pub quantity: i32,
}

/// 订单
///
/// 持久化后不可变：总价/总成本按创建时解析到的单价冻结，之后的价格变动不会回溯。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub total_price: f64,
    pub total_cost: f64,
    pub creation_date: DateTime<Utc>,
    pub items: Vec<OrderLineItem>,
}

impl Order {
    /// 订单计入的日聚合 key（UTC 日期）
    pub fn aggregate_day(&self) -> NaiveDate {
        day_start_utc(self.creation_date)
    }
}

/// 商品（只读，由目录服务维护）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub price: f64,
    pub cost: f64,
}

/// 价格解析结果，只保留定价需要的字段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemPrice {
    pub price: f64,
    pub cost: f64,
}

impl From<&Item> for ItemPrice {
    fn from(item: &Item) -> Self {
        Self {
            price: item.price,
            cost: item.cost,
        }
    }
}

/// 餐厅日聚合
///
/// 按 (餐厅, UTC 日期) 增量维护，等于当天该餐厅所有已持久化订单的 (1, total_price) 之和。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub restaurant_id: Uuid,
    pub day: NaiveDate,
    pub total_orders: i64,
    pub revenue: f64,
}

/// 热门商品统计行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PopularItem {
    pub item_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
}

/// orders 表的一行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub total_price: f64,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
}

/// order_items 表的一行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub order_id: Uuid,
    pub position: i32,
    pub item_id: Uuid,
    pub quantity: i32,
}

/// 将订单行与订单明细行组装为 `Order`
///
/// 输出顺序与 `rows` 一致；明细按 position 排序，找不到订单的明细行被忽略。
pub fn assemble_orders(rows: Vec<OrderRow>, items: Vec<OrderItemRow>) -> Vec<Order> {
    let mut by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let mut lines = by_order.remove(&row.id).unwrap_or_default();
            lines.sort_by_key(|line| line.position);

            Order {
                id: row.id,
                restaurant_id: row.restaurant_id,
                total_price: row.total_price,
                total_cost: row.total_cost,
                creation_date: row.created_at,
                items: lines
                    .into_iter()
                    .map(|line| OrderLineItem {
                        item_id: line.item_id,
                        quantity: line.quantity,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// 时间戳所在的 UTC 日期
pub fn day_start_utc(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

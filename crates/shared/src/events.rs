//! 订单事件模型与校验
//!
//! 定义下单请求在消息总线上传输的事件格式，以及发布端与消费端共用的校验逻辑。
//! 事件只存在于 Intake 与 Consumer 之间，不会原样落库。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrderError;
use crate::models::OrderLineItem;

// ---------------------------------------------------------------------------
// OrderEvent 线上传输格式
// ---------------------------------------------------------------------------

/// 事件中的单个商品
///
/// 字段保持外部字符串形态，校验前不做任何类型转换，
/// 这样格式错误的事件也能被完整解码并记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEventItem {
    pub id: String,
    pub quantity: i64,
}

impl OrderEventItem {
    pub fn new(id: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: id.into(),
            quantity,
        }
    }
}

/// 下单事件
///
/// 线上格式：`{ "restaurantId": "<uuid>", "items": [ { "id": "<uuid>", "quantity": 2 } ] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub restaurant_id: String,
    #[serde(default)]
    pub items: Vec<OrderEventItem>,
}

/// 通过校验的订单请求，所有 ID 已解析、数量均为正数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub restaurant_id: Uuid,
    pub line_items: Vec<OrderLineItem>,
}

impl OrderEvent {
    pub fn new(restaurant_id: impl Into<String>, items: Vec<OrderEventItem>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            items,
        }
    }

    /// 校验事件并转换为强类型订单
    ///
    /// 全有或全无：任意一个商品的 ID 或数量不合法，整个事件都被拒绝。
    pub fn validate(&self) -> Result<ValidatedOrder, OrderError> {
        let restaurant_id = parse_restaurant_id(&self.restaurant_id)?;

        if self.items.is_empty() {
            return Err(OrderError::invalid("items", "至少需要一个商品"));
        }

        let line_items = self
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| validate_item(idx, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedOrder {
            restaurant_id,
            line_items,
        })
    }
}

/// 解析餐厅 ID（外部字符串形态）
pub fn parse_restaurant_id(raw: &str) -> Result<Uuid, OrderError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(OrderError::invalid("restaurantId", "缺少餐厅 ID"));
    }
    Uuid::parse_str(raw).map_err(|_| OrderError::invalid("restaurantId", "餐厅 ID 格式无效"))
}

fn validate_item(idx: usize, item: &OrderEventItem) -> Result<OrderLineItem, OrderError> {
    let field = format!("items[{idx}]");

    if item.id.trim().is_empty() {
        return Err(OrderError::invalid(field, "商品 ID 不能为空"));
    }
    let item_id = Uuid::parse_str(item.id.trim())
        .map_err(|_| OrderError::invalid(field.clone(), format!("商品 ID 格式无效: {}", item.id)))?;

    if item.quantity <= 0 {
        return Err(OrderError::invalid(field, "数量必须大于 0"));
    }
    let quantity = i32::try_from(item.quantity)
        .map_err(|_| OrderError::invalid(field, "数量超出上限"))?;

    Ok(OrderLineItem { item_id, quantity })
}

//! 请求 DTO 定义

use order_shared::events::OrderEventItem;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 下单请求体，餐厅 ID 由 x-org 请求头给出
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "至少需要一个商品"), nested)]
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateOrderItem {
    #[validate(length(min = 1, message = "商品 ID 不能为空"))]
    pub id: String,
    #[validate(range(min = 1, message = "数量必须大于 0"))]
    pub quantity: i64,
}

impl CreateOrderRequest {
    pub fn into_event_items(self) -> Vec<OrderEventItem> {
        self.items
            .into_iter()
            .map(|item| OrderEventItem::new(item.id, item.quantity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_validation() {
        let valid: CreateOrderRequest = serde_json::from_str(
            r#"{"items":[{"id":"0b8e7d1c-2a33-4f4e-9a57-1a2b3c4d5e6f","quantity":2}]}"#,
        )
        .unwrap();
        assert!(valid.validate().is_ok());
        assert_eq!(valid.into_event_items()[0].quantity, 2);

        let empty: CreateOrderRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(empty.validate().is_err());

        let zero: CreateOrderRequest =
            serde_json::from_str(r#"{"items":[{"id":"I1","quantity":0}]}"#).unwrap();
        assert!(zero.validate().is_err());

        let blank: CreateOrderRequest =
            serde_json::from_str(r#"{"items":[{"id":"","quantity":1}]}"#).unwrap();
        assert!(blank.validate().is_err());
    }
}

//! 下单受理
//!
//! 校验请求、发布下单事件后立即返回，不等待订单落库。

use std::sync::Arc;

use order_shared::events::{OrderEvent, OrderEventItem};
use order_shared::observability::metrics;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::publisher::OrderEventPublisher;
use crate::recent_cache::RecentOrdersCache;

/// 受理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub status: &'static str,
}

impl Accepted {
    pub fn queued() -> Self {
        Self { status: "queued" }
    }
}

pub struct OrderIntake {
    publisher: Arc<dyn OrderEventPublisher>,
    recent: Arc<RecentOrdersCache>,
}

impl OrderIntake {
    pub fn new(publisher: Arc<dyn OrderEventPublisher>, recent: Arc<RecentOrdersCache>) -> Self {
        Self { publisher, recent }
    }

    /// 受理下单请求
    ///
    /// 发布成功后才失效近期订单缓存；发布失败时缓存保持原样。
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn submit(&self, restaurant_id: &str, items: Vec<OrderEventItem>) -> Result<Accepted> {
        let validated = match OrderEvent::new(restaurant_id, items).validate() {
            Ok(v) => v,
            Err(e) => {
                metrics::record_order_submitted("rejected");
                return Err(e.into());
            }
        };

        // 发布规范化后的事件，ID 统一为小写连字符格式
        let event = OrderEvent::new(
            validated.restaurant_id.to_string(),
            validated
                .line_items
                .iter()
                .map(|line| OrderEventItem::new(line.item_id.to_string(), i64::from(line.quantity)))
                .collect(),
        );

        if let Err(e) = self.publisher.publish(&event).await {
            warn!(restaurant_id = %validated.restaurant_id, error = %e, "下单事件发布失败");
            metrics::record_order_submitted("failed");
            return Err(e.into());
        }

        self.recent.invalidate(validated.restaurant_id).await;

        metrics::record_order_submitted("accepted");
        info!(
            restaurant_id = %validated.restaurant_id,
            line_items = validated.line_items.len(),
            "下单请求已受理"
        );
        Ok(Accepted::queued())
    }
}

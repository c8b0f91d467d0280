//! 下单事件发布

use async_trait::async_trait;
use order_shared::error::Result;
use order_shared::events::OrderEvent;
use order_shared::kafka::{KafkaProducer, topics};
use tracing::debug;

/// 下单事件发布接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderEventPublisher: Send + Sync {
    async fn publish(&self, event: &OrderEvent) -> Result<()>;
}

/// 基于 Kafka 的发布实现
///
/// 以餐厅 ID 作为消息 key，同一餐厅的事件落在同一分区。
pub struct KafkaEventPublisher {
    producer: KafkaProducer,
}

impl KafkaEventPublisher {
    pub fn new(producer: KafkaProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl OrderEventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<()> {
        let (partition, offset) = self
            .producer
            .send_json(topics::ORDER_EVENTS, &event.restaurant_id, event)
            .await?;

        debug!(
            restaurant_id = %event.restaurant_id,
            partition,
            offset,
            "下单事件已发布"
        );
        Ok(())
    }
}

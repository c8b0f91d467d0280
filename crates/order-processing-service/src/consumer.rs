//! Kafka 下单事件消费者
//!
//! 逐条解码、校验下单事件并交给 OrderMaterializer。
//! 无法解码或校验不通过的事件整条丢弃；物化失败只记录日志，不重试也不转投死信。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use order_shared::config::KafkaConfig;
use order_shared::events::OrderEvent;
use order_shared::kafka::{ConsumerMessage, KafkaConsumer, topics};
use order_shared::observability::{metrics, tracing::set_parent_from_headers};
use tokio::sync::watch;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{ProcessingError, Result};
use crate::materializer::OrderMaterializer;

/// 下单事件消费者
///
/// 每个进程一个实例，状态只有运行中和已停止两种。
pub struct OrderEventConsumer {
    consumer: KafkaConsumer,
    materializer: Arc<OrderMaterializer>,
}

impl OrderEventConsumer {
    pub fn new(config: &KafkaConfig, materializer: Arc<OrderMaterializer>) -> Result<Self> {
        let consumer = KafkaConsumer::new(config, None)?;
        Ok(Self {
            consumer,
            materializer,
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    ///
    /// 正在处理的事件会跑完再退出，退出时释放订阅。
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.consumer.subscribe(&[topics::ORDER_EVENTS])?;

        info!(topic = topics::ORDER_EVENTS, "下单事件消费者已启动");

        let materializer = self.materializer;

        self.consumer
            .start(shutdown, |msg| {
                let materializer = &materializer;
                async move {
                    let span = info_span!(
                        "consume_order_event",
                        partition = msg.partition,
                        offset = msg.offset,
                    );
                    set_parent_from_headers(&span, &msg.headers);

                    // 失败已在 handle_message 内记录，这里不再向上传播
                    let _ = handle_message(materializer, &msg).instrument(span).await;
                    Ok(())
                }
            })
            .await;

        info!("下单事件消费者已停止");
        Ok(())
    }
}

/// 消费循环存活标记，供就绪探针读取
///
/// 消费任务持有 `enter` 返回的守卫；任务无论正常结束、出错还是 panic，守卫释放时都会清除标记。
#[derive(Debug, Clone, Default)]
pub struct ConsumerLiveness(Arc<AtomicBool>);

impl ConsumerLiveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn enter(&self) -> LivenessGuard {
        self.0.store(true, Ordering::Release);
        LivenessGuard(self.0.clone())
    }
}

pub struct LivenessGuard(Arc<AtomicBool>);

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 处理单条消息：解码 -> 校验 -> 物化
///
/// 独立为函数，测试中无需构造 Kafka 消费者即可直接调用。
pub async fn handle_message(
    materializer: &OrderMaterializer,
    msg: &ConsumerMessage,
) -> Result<Uuid> {
    let result = process(materializer, msg).await;

    match &result {
        Ok(order_id) => {
            metrics::record_event_consumed("materialized");
            info!(order_id = %order_id, offset = msg.offset, "下单事件处理完成");
        }
        Err(ProcessingError::MalformedEvent(reason)) => {
            metrics::record_event_consumed("malformed");
            warn!(offset = msg.offset, reason = %reason, "下单事件无法解码，已丢弃");
        }
        Err(e) if e.is_rejected_event() => {
            metrics::record_event_consumed("invalid");
            warn!(offset = msg.offset, error = %e, "下单事件校验失败，整条丢弃");
        }
        Err(e) => {
            metrics::record_event_consumed("failed");
            let retryable = matches!(e, ProcessingError::Shared(inner) if inner.is_retryable());
            error!(
                offset = msg.offset,
                key = ?msg.key,
                retryable,
                error = %e,
                "订单物化失败，事件不会重试"
            );
        }
    }

    result
}

async fn process(materializer: &OrderMaterializer, msg: &ConsumerMessage) -> Result<Uuid> {
    let event: OrderEvent = msg
        .deserialize_payload()
        .map_err(|e| ProcessingError::MalformedEvent(e.to_string()))?;

    let order = event.validate()?;

    let order_id = materializer
        .materialize(order.restaurant_id, order.line_items)
        .await?;

    Ok(order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockItemRepositoryTrait, MockOrderRepositoryTrait};
    use crate::resolver::ItemPriceResolver;
    use order_shared::error::OrderError;
    use std::collections::HashMap;

    fn message(payload: &[u8]) -> ConsumerMessage {
        ConsumerMessage {
            topic: topics::ORDER_EVENTS.to_string(),
            partition: 0,
            offset: 7,
            key: None,
            payload: payload.to_vec(),
            timestamp: None,
            headers: HashMap::new(),
        }
    }

    /// 任何存储访问都会让测试失败的物化器
    fn untouched_materializer() -> OrderMaterializer {
        let mut items = MockItemRepositoryTrait::new();
        items.expect_find_by_ids().never();
        let mut orders = MockOrderRepositoryTrait::new();
        orders.expect_insert_order().never();
        orders.expect_increment_daily_aggregate().never();
        OrderMaterializer::new(ItemPriceResolver::new(Arc::new(items)), Arc::new(orders))
    }

    #[test]
    fn test_liveness_follows_guard() {
        let liveness = ConsumerLiveness::new();
        assert!(!liveness.is_alive());

        let guard = liveness.enter();
        let observer = liveness.clone();
        assert!(observer.is_alive());

        drop(guard);
        assert!(!observer.is_alive());
    }

    #[tokio::test]
    async fn test_liveness_cleared_when_task_fails() {
        let liveness = ConsumerLiveness::new();
        let guard = liveness.enter();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            Err::<(), _>(ProcessingError::MalformedEvent("subscribe failed".to_string()))
        });

        assert!(handle.await.unwrap().is_err());
        assert!(!liveness.is_alive());
    }

    #[tokio::test]
    async fn test_liveness_cleared_when_task_panics() {
        let liveness = ConsumerLiveness::new();
        let guard = liveness.enter();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("consumer crashed");
        });

        assert!(handle.await.is_err());
        assert!(!liveness.is_alive());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let materializer = untouched_materializer();
        let err = handle_message(&materializer, &message(b"{not json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MalformedEvent(_)));
    }

    #[tokio::test]
    async fn test_bad_item_id_drops_whole_event() {
        let materializer = untouched_materializer();
        let payload = format!(
            r#"{{"restaurantId":"{}","items":[{{"id":"bad-id","quantity":1}}]}}"#,
            Uuid::new_v4()
        );

        let err = handle_message(&materializer, &message(payload.as_bytes()))
            .await
            .unwrap_err();
        assert!(err.is_rejected_event());
    }

    #[tokio::test]
    async fn test_invalid_restaurant_id_is_dropped() {
        let materializer = untouched_materializer();
        let payload = format!(
            r#"{{"restaurantId":"R1","items":[{{"id":"{}","quantity":1}}]}}"#,
            Uuid::new_v4()
        );

        assert!(
            handle_message(&materializer, &message(payload.as_bytes()))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_valid_event_is_materialized() {
        let item_id = Uuid::new_v4();
        let restaurant_id = Uuid::new_v4();

        let mut items = MockItemRepositoryTrait::new();
        items.expect_find_by_ids().returning(move |_| {
            Ok(vec![order_shared::models::Item {
                id: item_id,
                restaurant_id,
                name: "Trail Steak".to_string(),
                price: 21.9,
                cost: 12.0,
            }])
        });
        let mut orders = MockOrderRepositoryTrait::new();
        orders.expect_insert_order().times(1).returning(|_| Ok(()));
        orders
            .expect_increment_daily_aggregate()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let materializer =
            OrderMaterializer::new(ItemPriceResolver::new(Arc::new(items)), Arc::new(orders));

        let payload = format!(
            r#"{{"restaurantId":"{restaurant_id}","items":[{{"id":"{item_id}","quantity":1}}]}}"#
        );
        let order_id = handle_message(&materializer, &message(payload.as_bytes()))
            .await
            .unwrap();
        assert!(!order_id.is_nil());
    }

    #[tokio::test]
    async fn test_materialize_failure_is_reported_not_rejected() {
        let mut items = MockItemRepositoryTrait::new();
        items
            .expect_find_by_ids()
            .returning(|_| Err(OrderError::Database(sqlx::Error::PoolTimedOut)));
        let orders = MockOrderRepositoryTrait::new();
        let materializer =
            OrderMaterializer::new(ItemPriceResolver::new(Arc::new(items)), Arc::new(orders));

        let payload = format!(
            r#"{{"restaurantId":"{}","items":[{{"id":"{}","quantity":2}}]}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let err = handle_message(&materializer, &message(payload.as_bytes()))
            .await
            .unwrap_err();
        assert!(!err.is_rejected_event());
    }
}

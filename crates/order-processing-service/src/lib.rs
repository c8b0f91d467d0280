//! 订单处理服务
//!
//! 消费 Kafka 下单事件，解析商品价格、持久化订单并维护餐厅日聚合；
//! 同时提供同步下单与订单查询的 HTTP 接口。

pub mod consumer;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod materializer;
pub mod repository;
pub mod resolver;
pub mod routes;
pub mod state;

pub use consumer::{ConsumerLiveness, OrderEventConsumer, handle_message};
pub use error::{ProcessingError, Result};
pub use materializer::{NewOrder, OrderMaterializer, OrderSource};
pub use resolver::ItemPriceResolver;

//! 下单服务
//!
//! 受理下单请求并发布到 Kafka，提供订单查询（含近期订单缓存）与经营分析接口。

pub mod analytics;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod publisher;
pub mod recent_cache;
pub mod repository;
pub mod routes;
pub mod state;

pub use analytics::{AnalyticsService, DailyAggregatesQuery, DateRangeQuery, PopularItemsQuery};
pub use error::{IntakeError, Result};
pub use intake::{Accepted, OrderIntake};
pub use publisher::{KafkaEventPublisher, OrderEventPublisher};
pub use recent_cache::{DataSource, ListOrdersResponse, RecentOrdersCache};

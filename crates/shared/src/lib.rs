//! 共享库
//!
//! 包含下单服务与订单处理服务共用的配置、错误处理、数据库连接、缓存、Kafka、
//! 事件格式与领域模型等基础设施代码。

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod kafka;
pub mod models;
pub mod observability;
pub mod test_utils;

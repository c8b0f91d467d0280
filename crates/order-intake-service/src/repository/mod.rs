//! 数据库仓储层（只读）

mod analytics_repo;
mod order_query_repo;
mod traits;

pub use analytics_repo::AnalyticsRepository;
pub use order_query_repo::OrderQueryRepository;
pub use traits::*;

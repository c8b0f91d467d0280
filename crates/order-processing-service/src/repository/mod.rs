//! 数据库仓储层
//!
//! 封装商品目录查询和订单持久化的 SQL 细节，仓储只负责数据存取，不包含定价逻辑。

mod item_repo;
mod order_repo;
mod traits;

pub use item_repo::ItemRepository;
pub use order_repo::OrderRepository;
pub use traits::*;

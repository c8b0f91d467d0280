//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，单元测试中通过 mockall 替换。

use async_trait::async_trait;
use chrono::NaiveDate;
use order_shared::error::Result;
use order_shared::models::{Item, Order};
use uuid::Uuid;

/// 商品目录仓储接口（只读）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepositoryTrait: Send + Sync {
    /// 按 ID 批量查询，不存在的 ID 不出现在结果中
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Item>>;
}

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 在同一事务中写入订单及其明细
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// 原子地为 (餐厅, 日期) 聚合计数 +1、营收 +revenue，记录不存在时先初始化
    async fn increment_daily_aggregate(
        &self,
        restaurant_id: Uuid,
        day: NaiveDate,
        revenue: f64,
    ) -> Result<()>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;

    /// 按创建时间倒序返回最近的订单
    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>>;
}

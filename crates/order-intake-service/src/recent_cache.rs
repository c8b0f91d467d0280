//! 近期订单缓存
//!
//! 旁路缓存策略：先查 Redis，未命中再查 PostgreSQL 并回写。
//! Redis 只保存派生数据，任何缓存故障都降级为未命中。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use order_shared::cache::{CacheKey, CacheStore};
use order_shared::error::Result;
use order_shared::models::Order;
use order_shared::observability::metrics;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::repository::OrderQueryRepositoryTrait;

/// 近期订单的时间窗口
pub const RECENT_WINDOW: Duration = Duration::from_secs(15 * 60);
/// 缓存条目存活时间
pub const RECENT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// 数据来源标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Redis,
    Database,
}

/// 订单列表响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOrdersResponse {
    pub from: DataSource,
    pub count: i64,
    pub results: Vec<Order>,
}

impl ListOrdersResponse {
    pub fn from_database(results: Vec<Order>) -> Self {
        Self {
            from: DataSource::Database,
            count: results.len() as i64,
            results,
        }
    }
}

pub struct RecentOrdersCache {
    cache: Arc<dyn CacheStore>,
    orders: Arc<dyn OrderQueryRepositoryTrait>,
    window: Duration,
    ttl: Duration,
}

impl RecentOrdersCache {
    pub fn new(cache: Arc<dyn CacheStore>, orders: Arc<dyn OrderQueryRepositoryTrait>) -> Self {
        Self {
            cache,
            orders,
            window: RECENT_WINDOW,
            ttl: RECENT_CACHE_TTL,
        }
    }

    /// 读取餐厅近期订单
    ///
    /// 只有数据库查询失败才会返回错误。
    #[instrument(skip(self))]
    pub async fn get(&self, restaurant_id: Uuid) -> Result<ListOrdersResponse> {
        let key = CacheKey::recent_orders(&restaurant_id.to_string());

        if let Some(mut cached) = self.lookup(&key).await {
            cached.from = DataSource::Redis;
            return Ok(cached);
        }

        let since = Utc::now()
            - chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::minutes(15));
        let orders = self.orders.list_since(restaurant_id, since).await?;
        let response = ListOrdersResponse::from_database(orders);

        match serde_json::to_string(&response) {
            Ok(payload) => {
                if let Err(e) = self.cache.set_raw(&key, &payload, self.ttl).await {
                    warn!(%restaurant_id, error = %e, "近期订单回写缓存失败");
                }
            }
            Err(e) => warn!(%restaurant_id, error = %e, "近期订单序列化失败"),
        }

        Ok(response)
    }

    /// 删除餐厅的缓存条目，失败只记录日志
    #[instrument(skip(self))]
    pub async fn invalidate(&self, restaurant_id: Uuid) {
        let key = CacheKey::recent_orders(&restaurant_id.to_string());
        if let Err(e) = self.cache.delete(&key).await {
            warn!(%restaurant_id, error = %e, "近期订单缓存失效失败");
        }
    }

    async fn lookup(&self, key: &str) -> Option<ListOrdersResponse> {
        let raw = match self.cache.get_raw(key).await {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                metrics::record_cache_lookup("miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "读取近期订单缓存失败，降级查询数据库");
                metrics::record_cache_lookup("error");
                return None;
            }
        };

        match serde_json::from_str::<ListOrdersResponse>(&raw) {
            Ok(cached) => {
                metrics::record_cache_lookup("hit");
                Some(cached)
            }
            Err(e) => {
                debug!(key, error = %e, "缓存内容无法解析，按未命中处理");
                metrics::record_cache_lookup("miss");
                None
            }
        }
    }
}

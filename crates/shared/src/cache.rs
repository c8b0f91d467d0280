//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和常用缓存操作封装。
//! 缓存只承载派生数据，任何操作失败都不应影响权威存储中的数据。

use crate::config::RedisConfig;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

/// 缓存存储抽象
///
/// 服务层依赖该 trait 而非具体的 Redis 客户端，
/// 便于在测试中替换为内存实现（见 `test_utils::MemoryCache`）。
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取原始字符串值，key 不存在时返回 None
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// 写入原始字符串值并设置过期时间
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// 删除 key，key 不存在时视为成功
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Redis 缓存客户端
///
/// 进程内所有请求共用同一个 `ConnectionManager`，克隆 `Cache` 只复制句柄。
/// 连接在首次使用时建立，断线后由 `ConnectionManager` 自动重连；
/// 建连失败时本次操作返回错误，下一次操作重新尝试。
#[derive(Clone)]
pub struct Cache {
    client: Client,
    conn: Arc<OnceCell<ConnectionManager>>,
}

impl Cache {
    /// 创建 Redis 客户端（不立即建连）
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self {
            client,
            conn: Arc::new(OnceCell::new()),
        })
    }

    /// 获取共享连接句柄
    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                // 只重试一次，Redis 不可用时尽快降级到数据库
                let config = ConnectionManagerConfig::new().set_number_of_retries(1);
                let manager = self.client.get_connection_manager_with_config(config).await?;
                info!("Redis connection established");
                Ok::<_, OrderError>(manager)
            })
            .await?;
        Ok(conn.clone())
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(OrderError::from)
    }
}

#[async_trait]
impl CacheStore for Cache {
    #[instrument(skip(self))]
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    /// 餐厅近期订单列表
    pub fn recent_orders(restaurant_id: &str) -> String {
        format!("recent_orders:{}", restaurant_id)
    }
}

//! Axum 应用共享状态

use std::sync::Arc;

use crate::analytics::AnalyticsService;
use crate::intake::OrderIntake;
use crate::recent_cache::RecentOrdersCache;
use crate::repository::OrderQueryRepositoryTrait;

#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<OrderIntake>,
    pub recent: Arc<RecentOrdersCache>,
    pub orders: Arc<dyn OrderQueryRepositoryTrait>,
    pub analytics: Arc<AnalyticsService>,
}

//! Axum 应用共享状态

use std::sync::Arc;

use crate::materializer::OrderMaterializer;
use crate::repository::OrderRepositoryTrait;

#[derive(Clone)]
pub struct AppState {
    pub materializer: Arc<OrderMaterializer>,
    pub orders: Arc<dyn OrderRepositoryTrait>,
}

impl AppState {
    pub fn new(materializer: Arc<OrderMaterializer>, orders: Arc<dyn OrderRepositoryTrait>) -> Self {
        Self {
            materializer,
            orders,
        }
    }
}

//! 应用状态定义

use std::sync::Arc;

use loyalty_engine::LoyaltyService;

/// Axum 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LoyaltyService>,
}

impl AppState {
    pub fn new(service: Arc<LoyaltyService>) -> Self {
        Self { service }
    }
}

use axum::{Router, routing::get};

use crate::AppState;

pub mod health;

/// 健康检查路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(health::ping))
        .route("/stats", get(health::stats))
        .with_state(state)
}

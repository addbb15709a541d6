use axum::{extract::State, http::StatusCode, response::IntoResponse};

use super::model::{PingResponse, StatsResponse};
use crate::AppState;
use crate::utils::success_to_api_response;

/// 健康检查接口
pub async fn ping() -> impl IntoResponse {
    let now = chrono::Utc::now();

    (
        StatusCode::OK,
        success_to_api_response(PingResponse {
            status: "ok".to_string(),
            timestamp: now.timestamp(),
        }),
    )
}

/// 分发结果统计
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        success_to_api_response(StatsResponse {
            window_secs: state.config.rate_limit_window_secs,
            limit_per_window: state.config.rate_limit_requests,
            outcomes: state.stats.snapshot(),
        }),
    )
}

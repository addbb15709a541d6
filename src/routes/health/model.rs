use serde::Serialize;

use crate::dispatcher::StatsSnapshot;

/// Ping响应
#[derive(Debug, Serialize)]
pub struct PingResponse {
    /// 服务状态
    pub status: String,
    /// 服务器时间
    pub timestamp: i64,
}

/// 分发统计
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub window_secs: u64,
    pub limit_per_window: u64,
    #[serde(flatten)]
    pub outcomes: StatsSnapshot,
}

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::DispatchOutcome;

/// 分发结果计数
#[derive(Debug, Default)]
pub struct DispatchStats {
    received: AtomicU64,
    in_flight: AtomicU64,
    delivered: AtomicU64,
    abandoned: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    ignored: AtomicU64,
}

/// 某一时刻的计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub in_flight: u64,
    pub delivered: u64,
    pub abandoned: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub ignored: u64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn task_started(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn task_finished(&self, outcome: &DispatchOutcome) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        let counter = match outcome {
            DispatchOutcome::Delivered => &self.delivered,
            DispatchOutcome::Abandoned { .. } => &self.abandoned,
            DispatchOutcome::Failed => &self.failed,
            DispatchOutcome::Cancelled => &self.cancelled,
            DispatchOutcome::Ignored => &self.ignored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }
}

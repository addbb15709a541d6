use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cache::CounterStore;
use crate::cache::keys::EXPIRE_INDEX_NAME;
use crate::cache::models::delivery::ExpiryIndex;
use crate::error::StoreError;
use crate::models::ChatId;

#[derive(Default)]
struct MemoryState {
    records: HashMap<ChatId, Vec<Instant>>,
    indexes: HashMap<String, ExpiryIndex>,
}

/// 进程内投递计数，用于单实例部署和测试
///
/// 统计时按记录年龄过滤，过期记录即使还没被清理也不计入；
/// 物理删除由 [`MemoryCounterStore::spawn_purger`] 周期性完成。
pub struct MemoryCounterStore {
    state: RwLock<MemoryState>,
    window: Duration,
}

impl MemoryCounterStore {
    pub fn new(window: Duration) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            window,
        }
    }

    /// 删除所有过期记录，返回删除数量
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let window = self.window;
        let mut state = self.state.write().await;

        let mut removed = 0;
        state.records.retain(|_, created| {
            let before = created.len();
            created.retain(|at| now.duration_since(*at) < window);
            removed += before - created.len();
            !created.is_empty()
        });
        removed
    }

    /// 已保存（包括尚未清理的过期记录）的记录总数
    pub async fn stored_records(&self) -> usize {
        self.state.read().await.records.values().map(Vec::len).sum()
    }

    /// 启动后台清理任务，直到 `token` 被取消
    pub fn spawn_purger(
        self: Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = self.purge_expired().await;
                        if removed > 0 {
                            tracing::debug!("purged {} expired delivery records", removed);
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn ensure_index(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.indexes.contains_key(EXPIRE_INDEX_NAME) {
            tracing::info!("index {} already exist", EXPIRE_INDEX_NAME);
            return Ok(());
        }

        state.indexes.insert(
            EXPIRE_INDEX_NAME.to_string(),
            ExpiryIndex::on_created_at(self.window.as_secs()),
        );
        tracing::info!("create index: {}", EXPIRE_INDEX_NAME);
        Ok(())
    }

    async fn record_delivery(&self, chat_id: ChatId) -> Result<(), StoreError> {
        let now = Instant::now();
        self.state
            .write()
            .await
            .records
            .entry(chat_id)
            .or_default()
            .push(now);
        Ok(())
    }

    async fn count_in_window(&self, chat_id: ChatId) -> Result<u64, StoreError> {
        let now = Instant::now();
        let state = self.state.read().await;

        let count = state
            .records
            .get(&chat_id)
            .map(|created| {
                created
                    .iter()
                    .filter(|at| now.duration_since(**at) < self.window)
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }
}

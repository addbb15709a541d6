use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::CounterStore;
use crate::cache::keys::{DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME, delivery_key};
use crate::cache::models::delivery::{DeliveryRecord, ExpiryIndex};
use crate::error::StoreError;
use crate::models::ChatId;

/// 基于 Redis 有序集合的投递计数
///
/// 每个会话一个有序集合，成员为记录 ID，分数为创建时间（毫秒）。
/// 统计时只计算窗口内的分数，写入时顺带清理窗口外的成员，
/// 并把整个键的过期时间刷新为一个窗口。
pub struct RedisCounterStore {
    connection_manager: ConnectionManager,
    window: Duration,
    timeout: Duration,
}

impl RedisCounterStore {
    /// 创建存储实例，连接失败视为启动错误
    pub async fn new(
        redis: &RedisClient,
        window: Duration,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let connection_manager = redis.get_connection_manager().await?;

        Ok(Self {
            connection_manager,
            window,
            timeout,
        })
    }

    fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn ensure_index(&self) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();

        // 先列出已有索引
        let indexes: HashMap<String, String> = self
            .with_timeout("list_indexes", conn.hgetall(DELIVERY_INDEX_KEY))
            .await?;
        tracing::debug!("all indexes for delivery records: {:?}", indexes);

        if let Some(existing) = indexes.get(EXPIRE_INDEX_NAME) {
            match serde_json::from_str::<ExpiryIndex>(existing) {
                Ok(index) if index.expire_after_secs != self.window.as_secs() => {
                    tracing::warn!(
                        "index {} already exist with expire_after_secs={}, configured window is {}s",
                        EXPIRE_INDEX_NAME,
                        index.expire_after_secs,
                        self.window.as_secs()
                    );
                }
                _ => tracing::info!("index {} already exist", EXPIRE_INDEX_NAME),
            }
            return Ok(());
        }

        let index = ExpiryIndex::on_created_at(self.window.as_secs());
        let json = serde_json::to_string(&index)?;
        let created: bool = self
            .with_timeout(
                "create_index",
                conn.hset_nx(DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME, json),
            )
            .await?;

        if created {
            tracing::info!("create index: {}", EXPIRE_INDEX_NAME);
        } else {
            // 并发启动的另一个实例先建好了
            tracing::info!("index {} already exist", EXPIRE_INDEX_NAME);
        }
        Ok(())
    }

    async fn record_delivery(&self, chat_id: ChatId) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();

        let record = DeliveryRecord::new(chat_id);
        let key = delivery_key(chat_id);
        let cutoff = record.score() - self.window_ms();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .zadd(&key, &record.id, record.score())
            .ignore()
            .zrembyscore(&key, "-inf", cutoff)
            .ignore()
            .expire(&key, self.window.as_secs() as i64)
            .ignore();

        self.with_timeout("record_delivery", pipe.query_async::<()>(&mut conn))
            .await?;
        tracing::debug!(
            "recorded delivery {} for chat {} at {}",
            record.id,
            record.chat_id,
            record.created_at
        );
        Ok(())
    }

    async fn count_in_window(&self, chat_id: ChatId) -> Result<u64, StoreError> {
        let mut conn = self.connection_manager.clone();

        let key = delivery_key(chat_id);
        let min = format!("({}", Utc::now().timestamp_millis() - self.window_ms());

        self.with_timeout("count_in_window", conn.zcount(&key, min, "+inf"))
            .await
    }
}

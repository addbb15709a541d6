// 缓存模块
// 投递计数存储，按接收者统计滑动窗口内的投递次数

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::ChatId;

pub mod keys;
pub mod models;
pub mod operations;

pub use models::delivery::{DeliveryRecord, ExpiryIndex};
pub use operations::{MemoryCounterStore, RedisCounterStore};

/// 按接收者计数的投递存储
///
/// 每条记录在写入后 `window` 秒内可见，之后由存储自行过期。
/// 实现必须允许任意多个任务并发读写。
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 确保过期索引存在，重复调用不修改已有索引
    async fn ensure_index(&self) -> Result<(), StoreError>;

    /// 写入一条投递记录，时间戳取当前时间
    async fn record_delivery(&self, chat_id: ChatId) -> Result<(), StoreError>;

    /// 统计窗口内未过期的投递记录数
    async fn count_in_window(&self, chat_id: ChatId) -> Result<u64, StoreError>;
}

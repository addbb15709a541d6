/// 投递记录缓存键前缀
const DELIVERY_PREFIX: &str = "delivery:chat:";

/// 过期索引描述所在的哈希键
pub const DELIVERY_INDEX_KEY: &str = "delivery:indexes";

/// 过期索引名称
pub const EXPIRE_INDEX_NAME: &str = "expireByTime";

/// 生成某个会话的投递记录键
pub fn delivery_key(chat_id: impl std::fmt::Display) -> String {
    format!("{}{}", DELIVERY_PREFIX, chat_id)
}

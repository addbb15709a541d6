/// 缓存键模块

// 投递记录缓存键
pub mod delivery_keys;

pub use delivery_keys::{DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME, delivery_key};

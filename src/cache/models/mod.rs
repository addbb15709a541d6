/// 缓存数据模型

// 投递记录模型
pub mod delivery;

pub use delivery::{DeliveryRecord, ExpiryIndex};

/// 计数存储的具体实现

// Redis 有序集合实现
pub mod delivery;

// 进程内实现
pub mod memory;

pub use delivery::RedisCounterStore;
pub use memory::MemoryCounterStore;

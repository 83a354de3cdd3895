pub mod keys;
pub mod memory;
pub mod null;
pub mod redis;
pub mod trait_def;

pub use memory::MemoryCache;
pub use null::NullCache;
pub use redis::RedisCache;
pub use trait_def::{CacheError, CacheLayer, CacheResult};

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了各缓存后端的区域适配器和管理器。

pub mod local;
pub mod memory;
pub mod redis;
pub mod redis_provider;

pub use local::{LocalCacheManager, LocalRegion, LocalSyncCache};
pub use memory::{MemoryAsyncCache, MemoryCacheManager, MemoryRegion};
pub use self::redis::{RedisAsyncCache, RedisCacheManager, RedisRegion};

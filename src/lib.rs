//! regioncache - 统一的异步缓存适配层
//!
//! 通过同一套基于待定结果（`PendingResult`）的接口访问可替换的缓存后端，
//! 读取时把后端保存的原始值转换为调用方请求的类型，
//! 条件写入（put-if-absent）在后端以单次原子操作完成。

#![doc(html_root_url = "https://docs.rs/regioncache/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod executor;
pub mod manager;
pub mod metrics;
pub mod pending;
pub mod telemetry;
pub mod utils;

// Re-export commonly used items
pub use cache::{AsyncCache, AsyncCacheExt, BlockingAsyncCache, SyncCache, SyncCacheExt};
pub use config::Config;
pub use convert::{ConversionService, Converter};
pub use error::{CacheError, Result};
pub use executor::CacheExecutor;
pub use manager::{CacheManager, DynamicCacheManager, NativeCache, RegionCache};
pub use pending::{Completer, PendingResult};

/// regioncache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

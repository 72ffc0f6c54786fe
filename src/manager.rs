//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了动态缓存管理器，按名称解析区域并返回绑定的适配器。

use crate::backend::{
    LocalCacheManager, LocalRegion, LocalSyncCache, MemoryAsyncCache, MemoryCacheManager,
    MemoryRegion, RedisAsyncCache, RedisCacheManager, RedisRegion,
};
use crate::cache::{AsyncCache, BlockingAsyncCache};
use crate::config::{BackendType, Config};
use crate::convert::ConversionService;
use crate::error::{CacheError, Result};
use crate::executor::CacheExecutor;
use crate::metrics::GLOBAL_METRICS;
use crate::pending::PendingResult;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// 动态缓存管理器特征
///
/// 按名称解析或创建后端区域，并返回绑定到该区域的适配器。
/// 同名多次调用得到功能等价、绑定同一区域的适配器。
pub trait DynamicCacheManager: Send + Sync {
    /// 返回的适配器类型
    type Cache;

    /// 获取指定名称的缓存
    ///
    /// # 参数
    ///
    /// * `name` - 区域名称
    ///
    /// # 返回值
    ///
    /// 名称非法时返回 `CacheError::InvalidArgument`
    fn get_cache(&self, name: &str) -> Result<Self::Cache>;
}

/// 按配置选择的后端管理器
enum BackendManager {
    Memory(MemoryCacheManager),
    Local(LocalCacheManager),
    Redis(RedisCacheManager),
}

/// 缓存管理器
///
/// 根据 `global.backend` 在构造时选择后端，之后所有区域都由该后端提供
pub struct CacheManager {
    backend: BackendManager,
    config: Arc<Config>,
}

impl CacheManager {
    /// 使用当前tokio运行时创建缓存管理器
    pub async fn new(config: Config) -> Result<Self> {
        let executor = CacheExecutor::current()?;
        Self::with_executor(config, executor).await
    }

    /// 使用指定的执行上下文创建缓存管理器
    ///
    /// 配置无效或后端不可达时返回错误。
    /// `global.enable_metrics` 写入进程级的指标开关，对已存在的管理器同样生效
    #[instrument(skip(config, executor), level = "info", fields(backend = ?config.global.backend))]
    pub async fn with_executor(config: Config, executor: CacheExecutor) -> Result<Self> {
        config.validate().map_err(CacheError::Configuration)?;
        let config = Arc::new(config);
        GLOBAL_METRICS.set_enabled(config.global.enable_metrics);

        let backend = match config.global.backend {
            BackendType::Memory => {
                BackendManager::Memory(MemoryCacheManager::new(config.clone(), executor))
            }
            BackendType::Local => {
                BackendManager::Local(LocalCacheManager::new(config.clone(), executor))
            }
            BackendType::Redis => BackendManager::Redis(
                RedisCacheManager::connect(config.clone(), executor).await?,
            ),
        };

        info!(
            "CacheManager initialized with {:?} backend ({} configured regions)",
            config.global.backend,
            config.regions.len()
        );
        Ok(Self { backend, config })
    }

    /// 当前使用的后端类型
    pub fn backend_type(&self) -> BackendType {
        self.config.global.backend
    }

    /// 管理器使用的配置
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl DynamicCacheManager for CacheManager {
    type Cache = RegionCache;

    fn get_cache(&self, name: &str) -> Result<RegionCache> {
        match &self.backend {
            BackendManager::Memory(m) => m.get_cache(name).map(RegionCache::Memory),
            BackendManager::Local(m) => m.get_async_cache(name).map(RegionCache::Local),
            BackendManager::Redis(m) => m.get_cache(name).map(RegionCache::Redis),
        }
    }
}

/// 任一后端的区域缓存
#[derive(Clone)]
pub enum RegionCache {
    Memory(MemoryAsyncCache),
    Local(BlockingAsyncCache<LocalSyncCache>),
    Redis(RedisAsyncCache),
}

/// 任一后端的原生句柄
#[derive(Clone)]
pub enum NativeCache {
    Memory(MemoryRegion),
    Local(LocalRegion),
    Redis(RedisRegion),
}

impl RegionCache {
    /// 获取同步视图（仅本地后端）
    pub fn as_sync(&self) -> Option<&LocalSyncCache> {
        match self {
            RegionCache::Local(c) => Some(c.sync_cache()),
            _ => None,
        }
    }
}

impl AsyncCache for RegionCache {
    type Native = NativeCache;

    fn name(&self) -> &str {
        match self {
            RegionCache::Memory(c) => c.name(),
            RegionCache::Local(c) => c.name(),
            RegionCache::Redis(c) => c.name(),
        }
    }

    fn native_cache(&self) -> NativeCache {
        match self {
            RegionCache::Memory(c) => NativeCache::Memory(c.native_cache()),
            RegionCache::Local(c) => NativeCache::Local(c.native_cache()),
            RegionCache::Redis(c) => NativeCache::Redis(c.native_cache()),
        }
    }

    fn conversion_service(&self) -> &ConversionService {
        match self {
            RegionCache::Memory(c) => c.conversion_service(),
            RegionCache::Local(c) => c.conversion_service(),
            RegionCache::Redis(c) => c.conversion_service(),
        }
    }

    fn executor(&self) -> &CacheExecutor {
        match self {
            RegionCache::Memory(c) => c.executor(),
            RegionCache::Local(c) => c.executor(),
            RegionCache::Redis(c) => c.executor(),
        }
    }

    fn get_value(&self, key: &str) -> Result<PendingResult<Option<Value>>> {
        match self {
            RegionCache::Memory(c) => c.get_value(key),
            RegionCache::Local(c) => c.get_value(key),
            RegionCache::Redis(c) => c.get_value(key),
        }
    }

    fn put_value(&self, key: &str, value: Value) -> Result<PendingResult<bool>> {
        match self {
            RegionCache::Memory(c) => c.put_value(key, value),
            RegionCache::Local(c) => c.put_value(key, value),
            RegionCache::Redis(c) => c.put_value(key, value),
        }
    }

    fn put_value_if_absent(
        &self,
        key: &str,
        value: Value,
    ) -> Result<PendingResult<Option<Value>>> {
        match self {
            RegionCache::Memory(c) => c.put_value_if_absent(key, value),
            RegionCache::Local(c) => c.put_value_if_absent(key, value),
            RegionCache::Redis(c) => c.put_value_if_absent(key, value),
        }
    }

    fn invalidate(&self, key: &str) -> Result<PendingResult<bool>> {
        match self {
            RegionCache::Memory(c) => c.invalidate(key),
            RegionCache::Local(c) => c.invalidate(key),
            RegionCache::Redis(c) => c.invalidate(key),
        }
    }

    fn invalidate_all(&self) -> Result<PendingResult<bool>> {
        match self {
            RegionCache::Memory(c) => c.invalidate_all(),
            RegionCache::Local(c) => c.invalidate_all(),
            RegionCache::Redis(c) => c.invalidate_all(),
        }
    }
}

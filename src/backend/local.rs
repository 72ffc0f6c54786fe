//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Moka同步缓存的区域实现。
//!
//! 该后端只提供阻塞接口，异步访问通过 `BlockingAsyncCache` 提交到阻塞线程池。

use crate::cache::{BlockingAsyncCache, SyncCache};
use crate::config::{validate_region_name, Config, RegionSettings};
use crate::convert::ConversionService;
use crate::error::{require_non_empty, require_value, CacheError, Result};
use crate::executor::CacheExecutor;
use crate::manager::DynamicCacheManager;
use crate::metrics::GLOBAL_METRICS;
use dashmap::DashMap;
use moka::sync::Cache;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const BACKEND: &str = "local";

/// 本地同步区域的原生句柄
pub type LocalRegion = Cache<String, Value>;

fn build_region(name: &str, settings: &RegionSettings) -> LocalRegion {
    let mut builder = Cache::builder()
        .name(name)
        .max_capacity(settings.max_capacity);
    if let Some(ttl) = settings.ttl {
        builder = builder.time_to_live(ttl);
    }
    builder.build()
}

/// 基于Moka同步缓存的区域
#[derive(Clone)]
pub struct LocalSyncCache {
    name: Arc<str>,
    native: LocalRegion,
    conversion: ConversionService,
}

impl LocalSyncCache {
    pub fn new(name: &str, native: LocalRegion, conversion: ConversionService) -> Self {
        Self {
            name: Arc::from(name),
            native,
            conversion,
        }
    }
}

impl SyncCache for LocalSyncCache {
    type Native = LocalRegion;

    fn name(&self) -> &str {
        &self.name
    }

    fn native_cache(&self) -> LocalRegion {
        self.native.clone()
    }

    fn conversion_service(&self) -> &ConversionService {
        &self.conversion
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name))]
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        require_non_empty("key", key)?;
        GLOBAL_METRICS.record_request(&self.name, BACKEND, "get", "attempt");
        let value = self.native.get(key);
        let result = if value.is_some() { "hit" } else { "miss" };
        GLOBAL_METRICS.record_request(&self.name, BACKEND, "get", result);
        debug!("local get: region={}, key={}, {}", self.name, key, result);
        Ok(value)
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.name))]
    fn put_value(&self, key: &str, value: Value) -> Result<()> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        self.native.insert(key.to_string(), value);
        GLOBAL_METRICS.record_request(&self.name, BACKEND, "put", "success");
        Ok(())
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.name))]
    fn put_value_if_absent(&self, key: &str, value: Value) -> Result<Option<Value>> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        let entry = self.native.entry(key.to_string()).or_insert_with(|| value);
        let installed = entry.is_fresh();
        GLOBAL_METRICS.record_request(
            &self.name,
            BACKEND,
            "put_if_absent",
            if installed { "installed" } else { "existing" },
        );
        if installed {
            Ok(None)
        } else {
            Ok(Some(entry.into_value()))
        }
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name))]
    fn invalidate(&self, key: &str) -> Result<()> {
        require_non_empty("key", key)?;
        self.native.invalidate(key);
        GLOBAL_METRICS.record_request(&self.name, BACKEND, "invalidate", "success");
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name))]
    fn invalidate_all(&self) -> Result<()> {
        self.native.invalidate_all();
        self.native.run_pending_tasks();
        GLOBAL_METRICS.record_request(&self.name, BACKEND, "invalidate_all", "success");
        Ok(())
    }
}

/// 本地同步缓存管理器
///
/// `get_cache` 返回同步区域；`get_async_cache` 返回绑定到执行上下文的异步桥接
pub struct LocalCacheManager {
    regions: DashMap<String, LocalRegion>,
    config: Arc<Config>,
    conversion: ConversionService,
    executor: CacheExecutor,
}

impl LocalCacheManager {
    pub fn new(config: Arc<Config>, executor: CacheExecutor) -> Self {
        let conversion = ConversionService::from(&config.global.conversion);
        Self {
            regions: DashMap::new(),
            config,
            conversion,
            executor,
        }
    }

    /// 获取区域的异步视图
    pub fn get_async_cache(&self, name: &str) -> Result<BlockingAsyncCache<LocalSyncCache>> {
        let cache = self.get_cache(name)?;
        Ok(cache.into_async(self.executor.clone()))
    }
}

impl DynamicCacheManager for LocalCacheManager {
    type Cache = LocalSyncCache;

    #[instrument(skip(self), level = "debug")]
    fn get_cache(&self, name: &str) -> Result<LocalSyncCache> {
        validate_region_name(name).map_err(CacheError::InvalidArgument)?;
        let native = self
            .regions
            .entry(name.to_string())
            .or_insert_with(|| {
                let settings = self.config.region_settings(name);
                info!(
                    "Creating local region {} (max_capacity={}, ttl={:?})",
                    name, settings.max_capacity, settings.ttl
                );
                build_region(name, &settings)
            })
            .clone();
        Ok(LocalSyncCache::new(name, native, self.conversion))
    }
}

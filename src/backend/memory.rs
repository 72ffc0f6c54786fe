//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Moka异步缓存的区域适配器和管理器。

use crate::cache::AsyncCache;
use crate::config::{validate_region_name, Config, RegionSettings};
use crate::convert::ConversionService;
use crate::error::{require_non_empty, require_value, CacheError, Result};
use crate::executor::CacheExecutor;
use crate::manager::DynamicCacheManager;
use crate::metrics::GLOBAL_METRICS;
use crate::pending::PendingResult;
use dashmap::DashMap;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

const BACKEND: &str = "memory";

/// 内存区域的原生句柄
pub type MemoryRegion = Cache<String, Value>;

/// 按区域设置构建内存区域
pub fn build_region(name: &str, settings: &RegionSettings) -> MemoryRegion {
    let mut builder = Cache::builder()
        .name(name)
        .max_capacity(settings.max_capacity);
    if let Some(ttl) = settings.ttl {
        builder = builder.time_to_live(ttl);
    }
    builder.build()
}

/// 基于Moka异步缓存的区域适配器
///
/// 每个操作把原生 future 提交到执行上下文，在其完成时解析待定结果
#[derive(Clone)]
pub struct MemoryAsyncCache {
    name: Arc<str>,
    native: MemoryRegion,
    conversion: ConversionService,
    executor: CacheExecutor,
}

impl MemoryAsyncCache {
    /// 创建新的内存区域适配器
    pub fn new(
        name: &str,
        native: MemoryRegion,
        conversion: ConversionService,
        executor: CacheExecutor,
    ) -> Self {
        Self {
            name: Arc::from(name),
            native,
            conversion,
            executor,
        }
    }
}

impl AsyncCache for MemoryAsyncCache {
    type Native = MemoryRegion;

    fn name(&self) -> &str {
        &self.name
    }

    fn native_cache(&self) -> MemoryRegion {
        self.native.clone()
    }

    fn conversion_service(&self) -> &ConversionService {
        &self.conversion
    }

    fn executor(&self) -> &CacheExecutor {
        &self.executor
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name))]
    fn get_value(&self, key: &str) -> Result<PendingResult<Option<Value>>> {
        require_non_empty("key", key)?;
        let native = self.native.clone();
        let region = self.name.clone();
        let key = key.to_string();
        GLOBAL_METRICS.record_request(&region, BACKEND, "get", "attempt");
        Ok(self.executor.complete_with(async move {
            let start = Instant::now();
            let value = native.get(&key).await;
            GLOBAL_METRICS.record_duration(&region, BACKEND, "get", start.elapsed().as_secs_f64());
            let result = if value.is_some() { "hit" } else { "miss" };
            GLOBAL_METRICS.record_request(&region, BACKEND, "get", result);
            debug!("memory get: region={}, key={}, {}", region, key, result);
            Ok(value)
        }))
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.name))]
    fn put_value(&self, key: &str, value: Value) -> Result<PendingResult<bool>> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        let native = self.native.clone();
        let region = self.name.clone();
        let key = key.to_string();
        Ok(self.executor.complete_with(async move {
            native.insert(key, value).await;
            GLOBAL_METRICS.record_request(&region, BACKEND, "put", "success");
            Ok(true)
        }))
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.name))]
    fn put_value_if_absent(
        &self,
        key: &str,
        value: Value,
    ) -> Result<PendingResult<Option<Value>>> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        let native = self.native.clone();
        let region = self.name.clone();
        let key = key.to_string();
        Ok(self.executor.complete_with(async move {
            // entry 选择器对同一个键的初始化是互斥的
            let entry = native.entry(key).or_insert_with(async { value }).await;
            let installed = entry.is_fresh();
            GLOBAL_METRICS.record_request(
                &region,
                BACKEND,
                "put_if_absent",
                if installed { "installed" } else { "existing" },
            );
            debug!(
                "memory put_if_absent: region={}, key={}, installed={}",
                region,
                entry.key(),
                installed
            );
            if installed {
                Ok(None)
            } else {
                Ok(Some(entry.into_value()))
            }
        }))
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name))]
    fn invalidate(&self, key: &str) -> Result<PendingResult<bool>> {
        require_non_empty("key", key)?;
        let native = self.native.clone();
        let region = self.name.clone();
        let key = key.to_string();
        Ok(self.executor.complete_with(async move {
            native.invalidate(&key).await;
            GLOBAL_METRICS.record_request(&region, BACKEND, "invalidate", "success");
            Ok(true)
        }))
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name))]
    fn invalidate_all(&self) -> Result<PendingResult<bool>> {
        let native = self.native.clone();
        let region = self.name.clone();
        Ok(self.executor.complete_with(async move {
            native.invalidate_all();
            native.run_pending_tasks().await;
            GLOBAL_METRICS.record_request(&region, BACKEND, "invalidate_all", "success");
            debug!("memory invalidate_all: region={} 已清空", region);
            Ok(true)
        }))
    }
}

/// 内存缓存管理器
///
/// 持有区域名称到Moka缓存的映射，首次解析时按配置创建区域
pub struct MemoryCacheManager {
    regions: DashMap<String, MemoryRegion>,
    config: Arc<Config>,
    conversion: ConversionService,
    executor: CacheExecutor,
}

impl MemoryCacheManager {
    /// 创建新的内存缓存管理器
    pub fn new(config: Arc<Config>, executor: CacheExecutor) -> Self {
        let conversion = ConversionService::from(&config.global.conversion);
        Self {
            regions: DashMap::new(),
            config,
            conversion,
            executor,
        }
    }

    /// 已创建的区域名称
    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.key().clone()).collect()
    }
}

impl DynamicCacheManager for MemoryCacheManager {
    type Cache = MemoryAsyncCache;

    #[instrument(skip(self), level = "debug")]
    fn get_cache(&self, name: &str) -> Result<MemoryAsyncCache> {
        validate_region_name(name).map_err(CacheError::InvalidArgument)?;
        let native = self
            .regions
            .entry(name.to_string())
            .or_insert_with(|| {
                let settings = self.config.region_settings(name);
                info!(
                    "Creating memory region {} (max_capacity={}, ttl={:?})",
                    name, settings.max_capacity, settings.ttl
                );
                build_region(name, &settings)
            })
            .clone();
        Ok(MemoryAsyncCache::new(
            name,
            native,
            self.conversion,
            self.executor.clone(),
        ))
    }
}

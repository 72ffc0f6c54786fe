//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步缓存接口，供只有阻塞客户端的后端实现。

use super::{convert_existing, BlockingAsyncCache};
use crate::convert::{to_stored_value, ConversionService, Converter};
use crate::error::{require_non_empty, Result};
use crate::executor::CacheExecutor;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

/// 同步缓存特征
///
/// 所有操作在调用线程上阻塞执行
pub trait SyncCache: Send + Sync {
    /// 后端原生句柄类型
    type Native: Clone;

    /// 区域名称
    fn name(&self) -> &str;

    /// 获取后端原生句柄
    fn native_cache(&self) -> Self::Native;

    /// 绑定的转换服务
    fn conversion_service(&self) -> &ConversionService;

    /// 读取原始值
    fn get_value(&self, key: &str) -> Result<Option<Value>>;

    /// 无条件写入原始值
    fn put_value(&self, key: &str, value: Value) -> Result<()>;

    /// 原子地在键不存在时写入，键已存在时返回已有值
    fn put_value_if_absent(&self, key: &str, value: Value) -> Result<Option<Value>>;

    /// 删除缓存项
    fn invalidate(&self, key: &str) -> Result<()>;

    /// 清空区域内所有缓存项
    fn invalidate_all(&self) -> Result<()>;

    /// 转换为异步缓存
    ///
    /// 每个操作作为阻塞任务提交到给定的执行上下文
    fn into_async(self, executor: CacheExecutor) -> BlockingAsyncCache<Self>
    where
        Self: Sized + 'static,
    {
        BlockingAsyncCache::new(self, executor)
    }
}

/// 同步缓存扩展特征
pub trait SyncCacheExt: SyncCache {
    /// 获取缓存值并转换为 `T`，无法转换时视为未命中
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        require_non_empty("key", key)?;
        Ok(self.get_value(key)?.and_then(|raw| {
            let converted = self.conversion_service().convert::<T>(&raw);
            if converted.is_none() {
                debug!(
                    "region={} key={} stored value not convertible to {}, treated as miss",
                    self.name(),
                    key,
                    std::any::type_name::<T>()
                );
            }
            converted
        }))
    }

    /// 获取缓存值，未命中时调用 `supplier` 计算并写入
    fn get_or_insert_with<T, F>(&self, key: &str, supplier: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>(key)? {
            return Ok(existing);
        }
        let value = supplier();
        self.put(key, &value)?;
        Ok(value)
    }

    /// 无条件写入缓存值
    fn put<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<()> {
        require_non_empty("key", key)?;
        let stored = to_stored_value("value", value)?;
        self.put_value(key, stored)
    }

    /// 原子地在键不存在时写入缓存值
    ///
    /// 已有值无法转换为 `V` 时返回 `CacheError::Conversion`
    fn put_if_absent<V>(&self, key: &str, value: &V) -> Result<Option<V>>
    where
        V: Serialize + DeserializeOwned,
    {
        require_non_empty("key", key)?;
        let stored = to_stored_value("value", value)?;
        let existing = self.put_value_if_absent(key, stored)?;
        convert_existing(self.conversion_service(), self.name(), key, existing)
    }
}

impl<C: SyncCache + ?Sized> SyncCacheExt for C {}

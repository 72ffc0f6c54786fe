//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了统一的缓存适配接口。
//!
//! `AsyncCache` 由每个后端实现一次，操作原始 JSON 值；
//! `AsyncCacheExt` 在其之上提供按调用方类型转换的操作。

pub mod blocking;
pub mod sync;

pub use blocking::BlockingAsyncCache;
pub use sync::{SyncCache, SyncCacheExt};

use crate::convert::{to_stored_value, ConversionService, Converter};
use crate::error::{require_non_empty, CacheError, Result};
use crate::executor::CacheExecutor;
use crate::pending::PendingResult;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// 异步缓存特征
///
/// 所有操作立即返回：参数错误以外层 `Err` 同步返回，
/// 后端错误通过 `PendingResult` 传递。
pub trait AsyncCache: Send + Sync {
    /// 后端原生句柄类型
    type Native: Clone;

    /// 区域名称
    fn name(&self) -> &str;

    /// 获取后端原生句柄，用于本接口未覆盖的操作
    fn native_cache(&self) -> Self::Native;

    /// 绑定的转换服务
    fn conversion_service(&self) -> &ConversionService;

    /// 绑定的执行上下文
    fn executor(&self) -> &CacheExecutor;

    /// 读取原始值
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    ///
    /// # 返回值
    ///
    /// 未命中时解析为 `None`
    fn get_value(&self, key: &str) -> Result<PendingResult<Option<Value>>>;

    /// 无条件写入原始值
    fn put_value(&self, key: &str, value: Value) -> Result<PendingResult<bool>>;

    /// 原子地在键不存在时写入
    ///
    /// # 返回值
    ///
    /// 写入成功解析为 `None`；键已存在时不写入，解析为已存在的原始值
    fn put_value_if_absent(&self, key: &str, value: Value)
        -> Result<PendingResult<Option<Value>>>;

    /// 删除缓存项，键不存在时同样解析为 `true`
    fn invalidate(&self, key: &str) -> Result<PendingResult<bool>>;

    /// 清空区域内所有缓存项
    fn invalidate_all(&self) -> Result<PendingResult<bool>>;
}

/// 异步缓存扩展特征
///
/// 提供类型安全的缓存操作接口
pub trait AsyncCacheExt: AsyncCache {
    /// 获取缓存值并转换为 `T`
    ///
    /// 值存在但无法转换时视为未命中
    fn get<T>(&self, key: &str) -> Result<PendingResult<Option<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        require_non_empty("key", key)?;
        let conversion = *self.conversion_service();
        let region = self.name().to_string();
        let key_owned = key.to_string();
        Ok(self.get_value(key)?.map(move |raw| {
            raw.and_then(|raw| {
                let converted = conversion.convert::<T>(&raw);
                if converted.is_none() {
                    debug!(
                        "region={} key={} stored value not convertible to {}, treated as miss",
                        region,
                        key_owned,
                        std::any::type_name::<T>()
                    );
                }
                converted
            })
        }))
    }

    /// 获取缓存值，未命中时调用 `supplier` 计算并回写
    ///
    /// 回写不等待完成，失败只记录日志，不影响本次结果。
    /// 并发未命中时 `supplier` 可能被多个调用方各自执行。
    fn get_or_insert_with<T, F>(&self, key: &str, supplier: F) -> Result<PendingResult<T>>
    where
        Self: Clone + 'static,
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let lookup = self.get::<T>(key)?;
        let cache = self.clone();
        let key = key.to_string();
        Ok(self.executor().complete_with(async move {
            if let Some(existing) = lookup.await? {
                return Ok(existing);
            }
            let value = supplier();
            match cache.put(&key, &value) {
                Ok(write) => {
                    let region = cache.name().to_string();
                    cache.executor().spawn(async move {
                        if let Err(e) = write.await {
                            warn!("region={} key={} write-back failed: {}", region, key, e);
                        }
                    });
                }
                Err(e) => warn!(
                    "region={} key={} supplied value not written back: {}",
                    cache.name(),
                    key,
                    e
                ),
            }
            Ok(value)
        }))
    }

    /// 无条件写入缓存值
    fn put<V>(&self, key: &str, value: &V) -> Result<PendingResult<bool>>
    where
        V: Serialize + ?Sized,
    {
        require_non_empty("key", key)?;
        let stored = to_stored_value("value", value)?;
        self.put_value(key, stored)
    }

    /// 原子地在键不存在时写入缓存值
    ///
    /// # 返回值
    ///
    /// 写入成功解析为 `None`；键已存在时解析为转换为 `V` 的已有值。
    /// 已有值无法转换为 `V` 时以 `CacheError::Conversion` 失败。
    fn put_if_absent<V>(&self, key: &str, value: &V) -> Result<PendingResult<Option<V>>>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
    {
        require_non_empty("key", key)?;
        let stored = to_stored_value("value", value)?;
        let conversion = *self.conversion_service();
        let region = self.name().to_string();
        let key_owned = key.to_string();
        Ok(self
            .put_value_if_absent(key, stored)?
            .and_then(move |existing| convert_existing(&conversion, &region, &key_owned, existing)))
    }
}

impl<C: AsyncCache + ?Sized> AsyncCacheExt for C {}

/// 将条件写入返回的已有值转换为候选值的类型
pub(crate) fn convert_existing<V: DeserializeOwned>(
    conversion: &ConversionService,
    region: &str,
    key: &str,
    existing: Option<Value>,
) -> Result<Option<V>> {
    match existing {
        None => Ok(None),
        Some(raw) => conversion.convert::<V>(&raw).map(Some).ok_or_else(|| {
            CacheError::Conversion(format!(
                "existing value for key '{}' in region '{}' cannot be converted to {}",
                key,
                region,
                std::any::type_name::<V>()
            ))
        }),
    }
}

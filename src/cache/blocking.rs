//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块将同步缓存桥接为异步缓存。

use super::{AsyncCache, SyncCache};
use crate::convert::ConversionService;
use crate::error::{require_non_empty, require_value, Result};
use crate::executor::CacheExecutor;
use crate::pending::PendingResult;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// 阻塞桥接的异步缓存
///
/// 参数在调用线程上校验，阻塞调用通过 `spawn_blocking` 提交到执行上下文，
/// 调用返回时解析待定结果。
pub struct BlockingAsyncCache<S> {
    inner: Arc<S>,
    executor: CacheExecutor,
}

impl<S> Clone for BlockingAsyncCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<S: SyncCache + 'static> BlockingAsyncCache<S> {
    /// 创建新的阻塞桥接缓存
    pub fn new(inner: S, executor: CacheExecutor) -> Self {
        Self {
            inner: Arc::new(inner),
            executor,
        }
    }

    /// 获取被包装的同步缓存
    pub fn sync_cache(&self) -> &S {
        &self.inner
    }
}

impl<S: SyncCache + 'static> AsyncCache for BlockingAsyncCache<S> {
    type Native = S::Native;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn native_cache(&self) -> Self::Native {
        self.inner.native_cache()
    }

    fn conversion_service(&self) -> &ConversionService {
        self.inner.conversion_service()
    }

    fn executor(&self) -> &CacheExecutor {
        &self.executor
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name()))]
    fn get_value(&self, key: &str) -> Result<PendingResult<Option<Value>>> {
        require_non_empty("key", key)?;
        let inner = self.inner.clone();
        let key = key.to_string();
        Ok(self.executor.complete_blocking(move || inner.get_value(&key)))
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.name()))]
    fn put_value(&self, key: &str, value: Value) -> Result<PendingResult<bool>> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        let inner = self.inner.clone();
        let key = key.to_string();
        Ok(self
            .executor
            .complete_blocking(move || inner.put_value(&key, value).map(|_| true)))
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.name()))]
    fn put_value_if_absent(
        &self,
        key: &str,
        value: Value,
    ) -> Result<PendingResult<Option<Value>>> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        let inner = self.inner.clone();
        let key = key.to_string();
        Ok(self
            .executor
            .complete_blocking(move || inner.put_value_if_absent(&key, value)))
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name()))]
    fn invalidate(&self, key: &str) -> Result<PendingResult<bool>> {
        require_non_empty("key", key)?;
        let inner = self.inner.clone();
        let key = key.to_string();
        Ok(self
            .executor
            .complete_blocking(move || inner.invalidate(&key).map(|_| true)))
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.name()))]
    fn invalidate_all(&self) -> Result<PendingResult<bool>> {
        let inner = self.inner.clone();
        Ok(self
            .executor
            .complete_blocking(move || inner.invalidate_all().map(|_| true)))
    }
}

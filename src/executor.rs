//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了适配器绑定的执行上下文。
//!
//! 执行上下文由调用方提供，适配器只提交任务，不负责其创建和关闭。

use crate::error::{CacheError, Result};
use crate::pending::PendingResult;
use std::future::Future;
use tokio::runtime::Handle;

/// 缓存执行上下文
///
/// 对 tokio 运行时句柄的轻量封装，可在任意线程上提交任务
#[derive(Clone, Debug)]
pub struct CacheExecutor {
    handle: Handle,
}

impl CacheExecutor {
    /// 使用指定的运行时句柄创建执行上下文
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// 使用当前运行时创建执行上下文
    ///
    /// 不在 tokio 运行时内调用时返回配置错误
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| CacheError::Configuration(format!("No tokio runtime available: {}", e)))
    }

    /// 获取底层运行时句柄
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// 提交一个无结果的异步任务
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }

    /// 提交异步任务，并在其完成时解析返回的待定结果
    ///
    /// 任务立即开始执行，与调用方是否等待结果无关
    pub fn complete_with<T, F>(&self, future: F) -> PendingResult<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (completer, pending) = PendingResult::channel();
        self.handle.spawn(async move {
            completer.resolve(future.await);
        });
        pending
    }

    /// 在阻塞线程池上执行同步调用，并在其返回时解析待定结果
    ///
    /// 调用发生 panic 时，待定结果以 `CacheError::Executor` 失败
    pub fn complete_blocking<T, F>(&self, f: F) -> PendingResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (completer, pending) = PendingResult::channel();
        self.handle.spawn_blocking(move || {
            completer.resolve(f());
        });
        pending
    }
}

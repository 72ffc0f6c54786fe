//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了待定结果（PendingResult）及其一次性写入单元（Completer）。
//!
//! 所有后端的完成机制（原生异步回调、阻塞调用）都桥接到这一个抽象上，
//! 后端特有的 future 类型不会越过适配器边界。

use crate::error::{CacheError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// 一次性写入的结果单元
///
/// 只能以成功或失败完成一次，完成后消费自身。
/// 未完成即被丢弃时，对应的 `PendingResult` 以 `CacheError::Executor` 失败。
pub struct Completer<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Completer<T> {
    /// 以成功值完成
    ///
    /// 返回接收端是否仍在等待
    pub fn complete(self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    /// 以错误完成
    pub fn fail(self, error: CacheError) -> bool {
        self.resolve(Err(error))
    }

    /// 以给定结果完成
    pub fn resolve(self, result: Result<T>) -> bool {
        self.tx.send(result).is_ok()
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// 待定结果
///
/// 缓存操作立即返回该值，稍后解析为成功值或失败原因。
/// 丢弃 `PendingResult` 不会取消已经发起的后端调用。
#[must_use = "a PendingResult does nothing visible unless awaited"]
pub struct PendingResult<T> {
    inner: BoxFuture<'static, Result<T>>,
}

impl<T: Send + 'static> PendingResult<T> {
    /// 创建一对（写入端，待定结果）
    pub fn channel() -> (Completer<T>, Self) {
        let (tx, rx) = oneshot::channel();
        let inner = async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(CacheError::Executor(
                    "completion dropped before the result was resolved".to_string(),
                )),
            }
        }
        .boxed();
        (Completer { tx }, Self { inner })
    }

    /// 创建已解析的待定结果
    pub fn ready(result: Result<T>) -> Self {
        Self {
            inner: futures::future::ready(result).boxed(),
        }
    }

    /// 映射成功值
    pub fn map<U, F>(self, f: F) -> PendingResult<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        PendingResult {
            inner: self.inner.map(|result| result.map(f)).boxed(),
        }
    }

    /// 以可能失败的函数映射成功值
    pub fn and_then<U, F>(self, f: F) -> PendingResult<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        PendingResult {
            inner: self.inner.map(|result| result.and_then(f)).boxed(),
        }
    }
}

impl<T> Future for PendingResult<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.poll_unpin(cx)
    }
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingResult")
    }
}

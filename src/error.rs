//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存适配层的错误类型。

use thiserror::Error;

/// 缓存适配层错误类型枚举
///
/// 参数错误在发起后端调用之前同步返回；后端错误通过 `PendingResult` 异步传递。
#[derive(Error, Debug)]
pub enum CacheError {
    /// 非法参数（空键、空区域名、空值等）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 已存在的值无法转换为请求的类型
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 无法连接后端或创建区域
    #[error("Connection error: {0}")]
    Connection(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 后端错误
    #[error("Backend error: {0}")]
    Backend(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 执行上下文错误（任务被丢弃或阻塞任务失败）
    #[error("Executor error: {0}")]
    Executor(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// 构造非法参数错误
    pub(crate) fn invalid(name: &str, reason: &str) -> Self {
        CacheError::InvalidArgument(format!("{} {}", name, reason))
    }
}

/// 缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, CacheError>;

/// 校验参数非空
///
/// # 参数
///
/// * `name` - 参数名称，用于错误信息
/// * `value` - 参数值
pub fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CacheError::invalid(name, "cannot be empty"));
    }
    Ok(())
}

/// 校验写入值非空
pub fn require_value(name: &str, value: &serde_json::Value) -> Result<()> {
    if value.is_null() {
        return Err(CacheError::invalid(name, "cannot be null"));
    }
    Ok(())
}

//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis连接提供者接口和默认实现。

use crate::config::{RedisConfig, RedisMode};
use crate::error::{CacheError, Result};
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use secrecy::ExposeSecret;
use tokio::time::{timeout, Duration};
use tracing::{info, instrument};

/// Redis连接提供者
///
/// 负责建立到Redis的连接，管理器通过它获取区域共享的连接
#[async_trait]
pub trait RedisProvider: Send + Sync {
    /// 建立单机模式连接
    async fn get_standalone_connection(&self, config: &RedisConfig) -> Result<ConnectionManager>;

    /// 通过哨兵建立连接，支持自动故障转移
    async fn get_sentinel_connection(&self, config: &RedisConfig) -> Result<ConnectionManager>;

    /// 按配置的模式建立连接
    async fn connect(&self, config: &RedisConfig) -> Result<ConnectionManager> {
        match config.mode {
            RedisMode::Standalone => self.get_standalone_connection(config).await,
            RedisMode::Sentinel => self.get_sentinel_connection(config).await,
        }
    }
}

pub struct DefaultRedisProvider;

/// 生成单机模式的连接字符串
///
/// 启用TLS时把 `redis://` 替换为 `rediss://`
pub fn standalone_url(config: &RedisConfig) -> String {
    let connection_string = config.connection_string.expose_secret();
    if config.enable_tls && !connection_string.starts_with("rediss://") {
        connection_string.replace("redis://", "rediss://")
    } else {
        connection_string.to_string()
    }
}

/// 生成哨兵模式的连接字符串
///
/// 格式: redis+sentinel://[:password@]host:port[,host:port]/master_name
pub fn sentinel_url(config: &RedisConfig) -> Result<String> {
    let sentinel_config = config.sentinel.as_ref().ok_or_else(|| {
        CacheError::Configuration("Sentinel configuration is missing".to_string())
    })?;

    let nodes: Vec<String> = sentinel_config
        .nodes
        .iter()
        .map(|n| {
            n.trim_start_matches("redis://")
                .trim_start_matches("redis+sentinel://")
                .to_string()
        })
        .collect();

    if nodes.is_empty() {
        return Err(CacheError::Configuration(
            "No sentinel nodes provided".to_string(),
        ));
    }

    let mut url = "redis+sentinel://".to_string();
    if let Some(password) = &config.password {
        url.push_str(&format!(":{}@", password.expose_secret()));
    }
    url.push_str(&nodes.join(","));
    url.push('/');
    url.push_str(&sentinel_config.master_name);
    Ok(url)
}

async fn open_manager(url: &str, timeout_ms: u64) -> Result<ConnectionManager> {
    let client = Client::open(url).map_err(|e| {
        CacheError::Configuration(format!(
            "Invalid Redis URL {}: {}",
            redact_connection_string(url),
            e
        ))
    })?;
    match timeout(
        Duration::from_millis(timeout_ms),
        client.get_connection_manager(),
    )
    .await
    {
        Ok(Ok(manager)) => Ok(manager),
        Ok(Err(e)) => Err(CacheError::Connection(format!(
            "Failed to connect to {}: {}",
            redact_connection_string(url),
            e
        ))),
        Err(_) => Err(CacheError::Connection(format!(
            "Connection timed out after {}ms. Target: {}",
            timeout_ms,
            redact_connection_string(url)
        ))),
    }
}

#[async_trait]
impl RedisProvider for DefaultRedisProvider {
    #[instrument(skip(self, config), level = "info")]
    async fn get_standalone_connection(&self, config: &RedisConfig) -> Result<ConnectionManager> {
        let url = standalone_url(config);
        info!("Connecting to Redis {}", redact_connection_string(&url));
        open_manager(&url, config.connection_timeout_ms).await
    }

    #[instrument(skip(self, config), level = "info")]
    async fn get_sentinel_connection(&self, config: &RedisConfig) -> Result<ConnectionManager> {
        let url = sentinel_url(config)?;
        info!("Initializing Sentinel connection with automatic failover support");
        open_manager(&url, config.connection_timeout_ms).await
    }
}

//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的区域适配器和管理器。
//!
//! 区域以键前缀 `{名称字节长度}:{region}:` 划分，多个区域共享同一个连接管理器。
//! 长度前缀保证任意两个区域的前缀互不为前缀，名称中含 `:` 也不会串区。
//! 值以JSON字节保存。

use crate::backend::redis_provider::{DefaultRedisProvider, RedisProvider};
use crate::cache::AsyncCache;
use crate::config::{validate_region_name, Config};
use crate::convert::ConversionService;
use crate::error::{require_non_empty, require_value, CacheError, Result};
use crate::executor::CacheExecutor;
use crate::manager::DynamicCacheManager;
use crate::metrics::GLOBAL_METRICS;
use crate::pending::PendingResult;
use lazy_static::lazy_static;
use redis::aio::ConnectionManager;
use redis::RedisResult;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const BACKEND: &str = "redis";

lazy_static! {
    // 读取与条件写入在服务端一次执行完成
    static ref PUT_IF_ABSENT_SCRIPT: redis::Script = redis::Script::new(
        r#"
        local current = redis.call('GET', KEYS[1])
        if current then
            return current
        end
        if tonumber(ARGV[2]) > 0 then
            redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
        else
            redis.call('SET', KEYS[1], ARGV[1])
        end
        return false
        "#,
    );
}

/// Redis区域的原生句柄
///
/// 区域名称、键前缀与共享连接的组合
#[derive(Clone)]
pub struct RedisRegion {
    name: Arc<str>,
    prefix: String,
    connection: ConnectionManager,
    ttl: Option<Duration>,
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRegion")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl RedisRegion {
    /// 区域名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 区域内键的前缀
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 区域写入的过期时间
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// 获取共享连接的克隆
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// 区域内键在Redis中的完整名称
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// 匹配区域内所有键的 SCAN 模式
    pub fn scan_pattern(&self) -> String {
        format!("{}*", escape_glob(&self.prefix))
    }
}

/// 区域名称对应的键前缀
///
/// 格式为 `{len}:{name}:`，`len` 为名称的字节长度
pub fn region_prefix(name: &str) -> String {
    format!("{}:{}:", name.len(), name)
}

/// 转义 SCAN MATCH 模式中的通配字符
pub fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

async fn with_timeout<T>(
    timeout: Duration,
    op: &str,
    fut: impl Future<Output = RedisResult<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(CacheError::from),
        Err(_) => Err(CacheError::Timeout(format!(
            "Redis {} timed out after {}ms",
            op,
            timeout.as_millis()
        ))),
    }
}

fn put_if_absent_outcome(result: &Result<Option<Vec<u8>>>) -> &'static str {
    match result {
        Ok(None) => "installed",
        Ok(Some(_)) => "existing",
        Err(_) => "failure",
    }
}

fn decode(bytes: Option<Vec<u8>>) -> Result<Option<Value>> {
    bytes
        .map(|b| serde_json::from_slice(&b).map_err(|e| CacheError::Serialization(e.to_string())))
        .transpose()
}

fn encode(value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// 基于Redis的区域适配器
#[derive(Clone)]
pub struct RedisAsyncCache {
    region: RedisRegion,
    conversion: ConversionService,
    executor: CacheExecutor,
}

impl RedisAsyncCache {
    pub fn new(region: RedisRegion, conversion: ConversionService, executor: CacheExecutor) -> Self {
        Self {
            region,
            conversion,
            executor,
        }
    }
}

impl AsyncCache for RedisAsyncCache {
    type Native = RedisRegion;

    fn name(&self) -> &str {
        self.region.name()
    }

    fn native_cache(&self) -> RedisRegion {
        self.region.clone()
    }

    fn conversion_service(&self) -> &ConversionService {
        &self.conversion
    }

    fn executor(&self) -> &CacheExecutor {
        &self.executor
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.region.name))]
    fn get_value(&self, key: &str) -> Result<PendingResult<Option<Value>>> {
        require_non_empty("key", key)?;
        let region = self.region.clone();
        let full_key = region.full_key(key);
        GLOBAL_METRICS.record_request(region.name(), BACKEND, "get", "attempt");
        Ok(self.executor.complete_with(async move {
            let mut conn = region.connection();
            let bytes: Option<Vec<u8>> = with_timeout(
                region.command_timeout,
                "GET",
                redis::cmd("GET").arg(&full_key).query_async(&mut conn),
            )
            .await
            .map_err(|e| {
                GLOBAL_METRICS.record_request(region.name(), BACKEND, "get", "failure");
                e
            })?;
            let result = if bytes.is_some() { "hit" } else { "miss" };
            GLOBAL_METRICS.record_request(region.name(), BACKEND, "get", result);
            debug!("redis get: key={}, {}", full_key, result);
            decode(bytes)
        }))
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.region.name))]
    fn put_value(&self, key: &str, value: Value) -> Result<PendingResult<bool>> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        let bytes = encode(&value)?;
        let region = self.region.clone();
        let full_key = region.full_key(key);
        Ok(self.executor.complete_with(async move {
            let mut conn = region.connection();
            let mut cmd = redis::cmd("SET");
            cmd.arg(&full_key).arg(bytes);
            if let Some(ttl) = region.ttl {
                cmd.arg("EX").arg(ttl.as_secs());
            }
            let result: Result<()> =
                with_timeout(region.command_timeout, "SET", cmd.query_async(&mut conn)).await;
            GLOBAL_METRICS.record_outcome(region.name(), BACKEND, "put", &result);
            result.map(|_| true)
        }))
    }

    #[instrument(skip(self, value), level = "debug", fields(region = %self.region.name))]
    fn put_value_if_absent(
        &self,
        key: &str,
        value: Value,
    ) -> Result<PendingResult<Option<Value>>> {
        require_non_empty("key", key)?;
        require_value("value", &value)?;
        let bytes = encode(&value)?;
        let region = self.region.clone();
        let full_key = region.full_key(key);
        let ttl_secs = region.ttl.map(|t| t.as_secs()).unwrap_or(0);
        Ok(self.executor.complete_with(async move {
            let mut conn = region.connection();
            let mut invocation = PUT_IF_ABSENT_SCRIPT.key(&full_key);
            invocation.arg(bytes).arg(ttl_secs);
            let result: Result<Option<Vec<u8>>> = with_timeout(
                region.command_timeout,
                "put_if_absent",
                invocation.invoke_async(&mut conn),
            )
            .await;
            let outcome = put_if_absent_outcome(&result);
            GLOBAL_METRICS.record_request(region.name(), BACKEND, "put_if_absent", outcome);
            debug!("redis put_if_absent: key={}, {}", full_key, outcome);
            decode(result?)
        }))
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.region.name))]
    fn invalidate(&self, key: &str) -> Result<PendingResult<bool>> {
        require_non_empty("key", key)?;
        let region = self.region.clone();
        let full_key = region.full_key(key);
        Ok(self.executor.complete_with(async move {
            let mut conn = region.connection();
            let result: Result<i64> = with_timeout(
                region.command_timeout,
                "DEL",
                redis::cmd("DEL").arg(&full_key).query_async(&mut conn),
            )
            .await;
            GLOBAL_METRICS.record_outcome(region.name(), BACKEND, "invalidate", &result);
            result.map(|_| true)
        }))
    }

    #[instrument(skip(self), level = "debug", fields(region = %self.region.name))]
    fn invalidate_all(&self) -> Result<PendingResult<bool>> {
        let region = self.region.clone();
        Ok(self.executor.complete_with(async move {
            let result = clear_region(&region).await;
            GLOBAL_METRICS.record_outcome(region.name(), BACKEND, "invalidate_all", &result);
            result.map(|removed| {
                debug!("redis invalidate_all: region={}, removed={}", region.name, removed);
                true
            })
        }))
    }
}

/// 通过 SCAN 删除区域内的所有键
///
/// 返回删除的键数量
async fn clear_region(region: &RedisRegion) -> Result<usize> {
    let pattern = region.scan_pattern();
    let mut conn = region.connection();
    let mut cursor = 0u64;
    let mut removed = 0usize;
    loop {
        let (next_cursor, keys): (u64, Vec<String>) = with_timeout(
            region.command_timeout,
            "SCAN",
            redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn),
        )
        .await?;

        if !keys.is_empty() {
            let mut pipe = redis::pipe();
            for key in &keys {
                pipe.del(key).ignore();
            }
            with_timeout(
                region.command_timeout,
                "DEL",
                pipe.query_async::<()>(&mut conn),
            )
            .await?;
            removed += keys.len();
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }
    Ok(removed)
}

/// Redis缓存管理器
///
/// 构造时建立连接；区域在Redis中是隐式的键前缀，解析区域不需要额外的往返
pub struct RedisCacheManager {
    connection: ConnectionManager,
    config: Arc<Config>,
    conversion: ConversionService,
    executor: CacheExecutor,
}

impl RedisCacheManager {
    /// 使用默认提供者连接Redis
    pub async fn connect(config: Arc<Config>, executor: CacheExecutor) -> Result<Self> {
        Self::connect_with_provider(config, Arc::new(DefaultRedisProvider), executor).await
    }

    /// 使用指定的提供者连接Redis
    #[instrument(skip(config, provider, executor), level = "info", fields(mode = ?config.redis.mode))]
    pub async fn connect_with_provider(
        config: Arc<Config>,
        provider: Arc<dyn RedisProvider>,
        executor: CacheExecutor,
    ) -> Result<Self> {
        let connection = provider.connect(&config.redis).await?;
        info!("Redis cache manager connected");
        let conversion = ConversionService::from(&config.global.conversion);
        Ok(Self {
            connection,
            config,
            conversion,
            executor,
        })
    }
}

impl DynamicCacheManager for RedisCacheManager {
    type Cache = RedisAsyncCache;

    #[instrument(skip(self), level = "debug")]
    fn get_cache(&self, name: &str) -> Result<RedisAsyncCache> {
        validate_region_name(name).map_err(CacheError::InvalidArgument)?;
        let settings = self.config.region_settings(name);
        let region = RedisRegion {
            name: Arc::from(name),
            prefix: region_prefix(name),
            connection: self.connection.clone(),
            ttl: settings.ttl,
            command_timeout: Duration::from_millis(self.config.redis.command_timeout_ms),
        };
        Ok(RedisAsyncCache::new(
            region,
            self.conversion,
            self.executor.clone(),
        ))
    }
}

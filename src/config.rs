//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存适配层的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_VERSION: u32 = 1;

/// 区域名称的最大长度
pub const MAX_REGION_NAME_LENGTH: usize = 64;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    /// 按区域名称覆盖的配置
    #[serde(default)]
    pub regions: HashMap<String, RegionConfig>,
}

/// 全局配置
///
/// 定义适用于所有区域的默认配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GlobalConfig {
    /// 后端类型
    pub backend: BackendType,
    /// 类型转换规则
    pub conversion: ConversionType,
    /// 默认的缓存过期时间（秒），0表示不过期
    pub default_ttl: u64,
    /// 进程内区域的默认最大条目数
    pub max_capacity: u64,
    /// 是否启用指标收集
    ///
    /// 指标是进程级的（`GLOBAL_METRICS`）：每次构建 `CacheManager` 都会用该值
    /// 覆盖全局开关，最后构建的管理器决定所有已有管理器是否记录指标
    pub enable_metrics: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Memory,
            conversion: ConversionType::Lenient,
            default_ttl: 0,
            max_capacity: 10000,
            enable_metrics: true,
        }
    }
}

/// 后端类型枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// 进程内异步缓存（moka future）
    #[default]
    Memory,
    /// 进程内同步缓存，通过阻塞线程池桥接为异步
    Local,
    /// Redis远程缓存
    Redis,
}

/// 类型转换规则枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversionType {
    /// 宽松转换，允许标量之间的常见转换
    #[default]
    Lenient,
    /// 严格转换，只接受可直接反序列化的值
    Strict,
}

/// 区域配置
///
/// 未设置的字段使用全局默认值
#[derive(Deserialize, Clone, Debug, Default)]
pub struct RegionConfig {
    /// 过期时间（秒），0表示不过期
    pub ttl: Option<u64>,
    /// 最大条目数（仅进程内后端）
    pub max_capacity: Option<u64>,
}

/// 创建区域时实际使用的设置
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionSettings {
    pub ttl: Option<Duration>,
    pub max_capacity: u64,
}

/// Redis配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis模式
    pub mode: RedisMode,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// Redis 密码（可选，使用 SecretString 保护）
    pub password: Option<SecretString>,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 哨兵配置
    pub sentinel: Option<SentinelConfig>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            password: None,
            enable_tls: false,
            sentinel: None,
        }
    }
}

/// 哨兵配置
#[derive(Deserialize, Clone, Debug)]
pub struct SentinelConfig {
    /// 主节点名称
    pub master_name: String,
    /// 哨兵节点列表
    pub nodes: Vec<String>,
}

/// Redis模式枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// 单机模式
    #[default]
    Standalone,
    /// 哨兵模式
    Sentinel,
}

impl Config {
    /// 从TOML字符串解析配置
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(s).map_err(|e| CacheError::Configuration(e.to_string()))?;
        config.validate().map_err(CacheError::Configuration)?;
        Ok(config)
    }

    /// 从TOML文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 解析指定区域的设置
    ///
    /// 区域配置覆盖全局默认值；TTL为0表示不过期
    pub fn region_settings(&self, name: &str) -> RegionSettings {
        let region = self.regions.get(name);
        let ttl = region
            .and_then(|r| r.ttl)
            .unwrap_or(self.global.default_ttl);
        let max_capacity = region
            .and_then(|r| r.max_capacity)
            .unwrap_or(self.global.max_capacity);
        RegionSettings {
            ttl: (ttl > 0).then(|| Duration::from_secs(ttl)),
            max_capacity,
        }
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值都在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.global.default_ttl > 86400 * 30 {
            return Err("Global default_ttl cannot exceed 30 days (2592000 seconds)".to_string());
        }

        if self.global.max_capacity == 0 {
            return Err("Global max_capacity cannot be zero".to_string());
        }

        for (name, region) in &self.regions {
            validate_region_name(name)?;

            if let Some(ttl) = region.ttl {
                if ttl > 86400 * 30 {
                    return Err(format!("Region '{}' TTL cannot exceed 30 days", name));
                }
            }

            if let Some(capacity) = region.max_capacity {
                if capacity == 0 {
                    return Err(format!("Region '{}' max_capacity cannot be zero", name));
                }
                if capacity > 10_000_000 {
                    return Err(format!(
                        "Region '{}' max_capacity cannot exceed 10,000,000",
                        name
                    ));
                }
            }
        }

        if self.global.backend == BackendType::Redis {
            let redis = &self.redis;
            if !(100..=30000).contains(&redis.connection_timeout_ms) {
                return Err("Redis connection_timeout_ms must be between 100 and 30000 ms".to_string());
            }
            if !(100..=60000).contains(&redis.command_timeout_ms) {
                return Err("Redis command_timeout_ms must be between 100 and 60000 ms".to_string());
            }
            if redis.mode == RedisMode::Sentinel && redis.sentinel.is_none() {
                return Err("Redis sentinel mode requires a [redis.sentinel] section".to_string());
            }
        }

        Ok(())
    }
}

/// 验证区域名称
pub fn validate_region_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Region name cannot be empty".to_string());
    }
    if name.len() > MAX_REGION_NAME_LENGTH {
        return Err(format!(
            "Region name '{}' exceeds maximum length of {} characters",
            name, MAX_REGION_NAME_LENGTH
        ));
    }
    Ok(())
}

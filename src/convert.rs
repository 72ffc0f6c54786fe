//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了类型转换服务。
//!
//! 后端以无类型的 JSON 值保存数据，读取时再按调用方请求的类型尽力转换。
//! 转换失败不是错误，只返回 `None`。

use crate::config::ConversionType;
use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Number, Value};

/// 转换器特征
///
/// 将原始存储值转换为目标类型，纯函数，不修改原始值
pub trait Converter: Send + Sync {
    /// 尝试将原始值转换为 `T`
    fn convert<T: DeserializeOwned>(&self, raw: &Value) -> Option<T>;
}

/// 严格转换器
///
/// 只接受可直接反序列化为目标类型的值
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictConverter;

impl Converter for StrictConverter {
    fn convert<T: DeserializeOwned>(&self, raw: &Value) -> Option<T> {
        T::deserialize(raw).ok()
    }
}

/// 宽松转换器
///
/// 先尝试直接反序列化，失败后依次尝试标量之间的常见转换：
/// 数字字符串与数字、`"true"`/`"false"` 与布尔值、标量转字符串、
/// 单元素数组解包以及标量包装为单元素数组。
#[derive(Clone, Copy, Debug, Default)]
pub struct LenientConverter;

impl Converter for LenientConverter {
    fn convert<T: DeserializeOwned>(&self, raw: &Value) -> Option<T> {
        if let Ok(value) = T::deserialize(raw) {
            return Some(value);
        }
        coercions(raw)
            .iter()
            .find_map(|candidate| T::deserialize(candidate).ok())
    }
}

fn coercions(raw: &Value) -> Vec<Value> {
    let mut out = match raw {
        Value::String(s) => string_coercions(s.trim()),
        Value::Number(n) => {
            let mut out = vec![Value::String(n.to_string())];
            // 3.0 -> 3
            if let Some(f) = n.as_f64() {
                if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    out.push(Value::from(f as i64));
                }
            }
            out
        }
        Value::Bool(b) => vec![Value::String(b.to_string())],
        Value::Array(items) if items.len() == 1 => {
            let mut out = vec![items[0].clone()];
            out.extend(coercions(&items[0]));
            out
        }
        _ => Vec::new(),
    };
    if !raw.is_array() && !raw.is_null() {
        out.push(Value::Array(vec![raw.clone()]));
    }
    out
}

fn string_coercions(s: &str) -> Vec<Value> {
    let mut out = Vec::new();
    if let Ok(i) = s.parse::<i64>() {
        out.push(Value::from(i));
    } else if let Ok(u) = s.parse::<u64>() {
        out.push(Value::from(u));
    }
    if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
        out.push(Value::Number(n));
    }
    match s.to_ascii_lowercase().as_str() {
        "true" => out.push(Value::Bool(true)),
        "false" => out.push(Value::Bool(false)),
        _ => {}
    }
    out
}

/// 转换服务枚举
///
/// 用于在适配器之间共享的转换服务，可按配置选择规则集
#[derive(Clone, Copy, Debug)]
pub enum ConversionService {
    Lenient(LenientConverter),
    Strict(StrictConverter),
}

impl Default for ConversionService {
    fn default() -> Self {
        ConversionService::Lenient(LenientConverter)
    }
}

impl From<&ConversionType> for ConversionService {
    fn from(kind: &ConversionType) -> Self {
        match kind {
            ConversionType::Lenient => ConversionService::Lenient(LenientConverter),
            ConversionType::Strict => ConversionService::Strict(StrictConverter),
        }
    }
}

impl Converter for ConversionService {
    fn convert<T: DeserializeOwned>(&self, raw: &Value) -> Option<T> {
        match self {
            ConversionService::Lenient(c) => c.convert(raw),
            ConversionService::Strict(c) => c.convert(raw),
        }
    }
}

/// 将调用方的值转换为存储用的 JSON 值
///
/// 无法序列化或序列化为 `null` 的值视为非法参数
pub fn to_stored_value<V: Serialize + ?Sized>(name: &str, value: &V) -> Result<Value> {
    let stored = serde_json::to_value(value)
        .map_err(|e| CacheError::invalid(name, &format!("cannot be serialized: {}", e)))?;
    crate::error::require_value(name, &stored)?;
    Ok(stored)
}

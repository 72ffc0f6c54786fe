//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存适配层的指标收集功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{span, Level};

/// 指标收集器
///
/// 用于收集和存储各区域的运行时指标
#[derive(Clone, Debug)]
pub struct Metrics {
    /// 是否记录指标
    enabled: Arc<AtomicBool>,
    /// 请求总数统计
    /// key: "region:backend:op:result"
    pub requests_total: Arc<Mutex<HashMap<String, u64>>>,
    /// 操作耗时（累积时间和计数）
    /// key: "region:backend:op" -> (total_duration_secs, count)
    pub operation_duration: Arc<Mutex<HashMap<String, (f64, u64)>>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            requests_total: Arc::default(),
            operation_duration: Arc::default(),
        }
    }
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

// 指标只做累加，锁中毒后继续使用内部数据
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Metrics {
    /// 开启或关闭指标记录
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// 指标记录是否开启
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `region` - 区域名称
    /// * `backend` - 后端类型（memory/local/redis）
    /// * `op` - 操作类型（get/put/put_if_absent/invalidate/invalidate_all）
    /// * `result` - 操作结果（attempt/hit/miss/success/failure）
    pub fn record_request(&self, region: &str, backend: &str, op: &str, result: &str) {
        if !self.is_enabled() {
            return;
        }
        let span = span!(Level::TRACE, "cache_request", region, backend, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}:{}", region, backend, op, result);
        *lock(&self.requests_total).entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, region: &str, backend: &str, op: &str, duration_secs: f64) {
        if !self.is_enabled() {
            return;
        }
        let key = format!("{}:{}:{}", region, backend, op);
        let mut map = lock(&self.operation_duration);
        let entry = map.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 记录操作结果（成功或失败）
    pub fn record_outcome<T, E>(
        &self,
        region: &str,
        backend: &str,
        op: &str,
        result: &std::result::Result<T, E>,
    ) {
        let outcome = if result.is_ok() { "success" } else { "failure" };
        self.record_request(region, backend, op, outcome);
    }

    /// 查询请求计数
    pub fn request_count(&self, region: &str, backend: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}:{}", region, backend, op, result);
        lock(&self.requests_total).get(&key).copied().unwrap_or(0)
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为Prometheus文本格式
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let reqs = lock(&metrics.requests_total);
    let dur = lock(&metrics.operation_duration);

    let mut output = String::new();
    for (k, v) in reqs.iter() {
        // 区域名可能包含冒号，从右侧拆分
        let parts: Vec<&str> = k.rsplitn(4, ':').collect();
        if parts.len() == 4 {
            output.push_str(&format!(
                "cache_requests_total{{region=\"{}\", backend=\"{}\", operation=\"{}\", result=\"{}\"}} {}\n",
                parts[3], parts[2], parts[1], parts[0], v
            ));
        }
    }
    for (k, (total, count)) in dur.iter() {
        let parts: Vec<&str> = k.rsplitn(3, ':').collect();
        if parts.len() == 3 {
            output.push_str(&format!(
                "cache_operation_duration_seconds_sum{{region=\"{}\", backend=\"{}\", operation=\"{}\"}} {}\n",
                parts[2], parts[1], parts[0], total
            ));
            output.push_str(&format!(
                "cache_operation_duration_seconds_count{{region=\"{}\", backend=\"{}\", operation=\"{}\"}} {}\n",
                parts[2], parts[1], parts[0], count
            ));
        }
    }
    output
}

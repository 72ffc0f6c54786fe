//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 指标收集测试

#[path = "../common/mod.rs"]
mod common;

use regioncache::config::{BackendType, ConversionType};
use regioncache::metrics::{get_metrics_string, GLOBAL_METRICS};
use regioncache::{AsyncCache, AsyncCacheExt, CacheManager, DynamicCacheManager};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_memory_operations_are_counted() {
    let manager = common::setup_manager(BackendType::Memory, ConversionType::Lenient).await;
    let region = common::unique_region_name("metrics_memory");
    let cache = manager.get_cache(&region).unwrap();

    cache.get::<u32>("k").unwrap().await.unwrap();
    cache.put("k", &1u32).unwrap().await.unwrap();
    cache.get::<u32>("k").unwrap().await.unwrap();
    cache.put_if_absent("k", &2u32).unwrap().await.unwrap();
    cache.put_if_absent("other", &3u32).unwrap().await.unwrap();
    cache.invalidate("k").unwrap().await.unwrap();

    let count = |op: &str, result: &str| GLOBAL_METRICS.request_count(&region, "memory", op, result);
    assert_eq!(count("get", "attempt"), 2);
    assert_eq!(count("get", "miss"), 1);
    assert_eq!(count("get", "hit"), 1);
    assert_eq!(count("put", "success"), 1);
    assert_eq!(count("put_if_absent", "existing"), 1);
    assert_eq!(count("put_if_absent", "installed"), 1);
    assert_eq!(count("invalidate", "success"), 1);

    let output = get_metrics_string();
    assert!(output.contains(&format!(
        "cache_requests_total{{region=\"{}\", backend=\"memory\", operation=\"get\", result=\"hit\"}} 1",
        region
    )));
    assert!(output.contains(&format!(
        "cache_operation_duration_seconds_count{{region=\"{}\", backend=\"memory\", operation=\"get\"}} 2",
        region
    )));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_local_operations_are_counted() {
    let manager = common::setup_manager(BackendType::Local, ConversionType::Lenient).await;
    let region = common::unique_region_name("metrics_local");
    let cache = manager.get_cache(&region).unwrap();

    cache.put("k", "v").unwrap().await.unwrap();
    cache.get::<String>("k").unwrap().await.unwrap();
    cache.invalidate_all().unwrap().await.unwrap();

    assert_eq!(GLOBAL_METRICS.request_count(&region, "local", "get", "attempt"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&region, "local", "put", "success"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&region, "local", "get", "hit"), 1);
    assert_eq!(
        GLOBAL_METRICS.request_count(&region, "local", "invalidate_all", "success"),
        1
    );
}

#[tokio::test]
#[serial]
async fn test_metrics_disabled_by_config() {
    common::setup_logging();
    let mut config = common::config_for(BackendType::Memory, ConversionType::Lenient);
    config.global.enable_metrics = false;
    let manager = CacheManager::new(config).await.unwrap();
    assert!(!GLOBAL_METRICS.is_enabled());

    let region = common::unique_region_name("metrics_disabled");
    let cache = manager.get_cache(&region).unwrap();
    cache.put("k", &1u8).unwrap().await.unwrap();
    cache.get::<u8>("k").unwrap().await.unwrap();

    assert_eq!(GLOBAL_METRICS.request_count(&region, "memory", "put", "success"), 0);
    assert_eq!(GLOBAL_METRICS.request_count(&region, "memory", "get", "hit"), 0);
    assert!(!get_metrics_string().contains(&region));

    GLOBAL_METRICS.set_enabled(true);
}

/// 指标开关是进程级的，最后构建的管理器的配置对所有管理器生效
#[tokio::test]
#[serial]
async fn test_metrics_switch_is_process_wide() {
    let first = common::setup_manager(BackendType::Memory, ConversionType::Lenient).await;
    assert!(GLOBAL_METRICS.is_enabled());

    let mut config = common::config_for(BackendType::Memory, ConversionType::Lenient);
    config.global.enable_metrics = false;
    let _second = CacheManager::new(config).await.unwrap();

    let region = common::unique_region_name("metrics_process_wide");
    let cache = first.get_cache(&region).unwrap();
    cache.put("k", &1u8).unwrap().await.unwrap();
    assert_eq!(GLOBAL_METRICS.request_count(&region, "memory", "put", "success"), 0);

    let _third = common::setup_manager(BackendType::Memory, ConversionType::Lenient).await;
    cache.put("k", &2u8).unwrap().await.unwrap();
    assert_eq!(GLOBAL_METRICS.request_count(&region, "memory", "put", "success"), 1);
}

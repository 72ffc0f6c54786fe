//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 适配器行为测试
//!
//! 同一组性质在每个后端上运行；Redis 不可用时跳过 Redis 部分。

#[path = "../common/mod.rs"]
mod common;

use regioncache::config::{BackendType, ConversionType};
use regioncache::serde_json::json;
use regioncache::{
    AsyncCache, AsyncCacheExt, CacheError, CacheManager, DynamicCacheManager, NativeCache,
    SyncCacheExt,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

async fn manager(backend: BackendType, conversion: ConversionType) -> Option<CacheManager> {
    if backend == BackendType::Redis && !common::is_redis_available().await {
        println!("Skipping: Redis not available at {}", common::redis_url());
        return None;
    }
    Some(common::setup_manager(backend, conversion).await)
}

/// 写入后读取得到等价的值，再次写入覆盖旧值
async fn check_round_trip(manager: &CacheManager) {
    let region = common::unique_region_name("round_trip");
    let cache = manager.get_cache(&region).unwrap();
    assert_eq!(cache.name(), region);

    let alice = User {
        id: 1,
        name: "alice".to_string(),
    };
    assert!(cache.put("user:1", &alice).unwrap().await.unwrap());
    assert_eq!(
        cache.get::<User>("user:1").unwrap().await.unwrap(),
        Some(alice)
    );

    let renamed = User {
        id: 1,
        name: "alice2".to_string(),
    };
    cache.put("user:1", &renamed).unwrap().await.unwrap();
    assert_eq!(
        cache.get::<User>("user:1").unwrap().await.unwrap(),
        Some(renamed)
    );
}

async fn check_never_written_is_miss(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("miss"))
        .unwrap();
    assert_eq!(cache.get::<String>("nothing").unwrap().await.unwrap(), None);
    assert_eq!(cache.get_value("nothing").unwrap().await.unwrap(), None);
}

async fn check_put_if_absent(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("put_if_absent"))
        .unwrap();

    let first = cache
        .put_if_absent("k", &"first".to_string())
        .unwrap()
        .await
        .unwrap();
    assert_eq!(first, None);

    let second = cache
        .put_if_absent("k", &"second".to_string())
        .unwrap()
        .await
        .unwrap();
    assert_eq!(second, Some("first".to_string()));

    assert_eq!(
        cache.get::<String>("k").unwrap().await.unwrap(),
        Some("first".to_string())
    );
}

async fn check_put_if_absent_coerces_existing(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("coerce_existing"))
        .unwrap();
    cache.put("k", &42u32).unwrap().await.unwrap();

    let existing = cache
        .put_if_absent("k", &"7".to_string())
        .unwrap()
        .await
        .unwrap();
    assert_eq!(existing, Some("42".to_string()));
}

async fn check_put_if_absent_conversion_failure(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("conversion_failure"))
        .unwrap();
    cache
        .put("k", &json!({"nested": [1, 2, 3]}))
        .unwrap()
        .await
        .unwrap();

    let result = cache.put_if_absent("k", &7u64).unwrap().await;
    assert!(matches!(result, Err(CacheError::Conversion(_))));
    // 已有值保持不变
    assert_eq!(
        cache.get_value("k").unwrap().await.unwrap(),
        Some(json!({"nested": [1, 2, 3]}))
    );
}

async fn check_invalidate(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("invalidate"))
        .unwrap();
    cache.put("a", &1).unwrap().await.unwrap();
    cache.put("b", &2).unwrap().await.unwrap();

    assert!(cache.invalidate("a").unwrap().await.unwrap());
    assert_eq!(cache.get::<i32>("a").unwrap().await.unwrap(), None);
    assert_eq!(cache.get::<i32>("b").unwrap().await.unwrap(), Some(2));

    assert!(cache.invalidate("never-written").unwrap().await.unwrap());
}

async fn check_invalidate_all(manager: &CacheManager) {
    let cleared = manager
        .get_cache(&common::unique_region_name("invalidate_all"))
        .unwrap();
    let untouched = manager
        .get_cache(&common::unique_region_name("invalidate_all_other"))
        .unwrap();

    for key in ["k1", "k2", "k3"] {
        cleared.put(key, key).unwrap().await.unwrap();
    }
    untouched.put("k1", "kept").unwrap().await.unwrap();

    assert!(cleared.invalidate_all().unwrap().await.unwrap());
    for key in ["k1", "k2", "k3"] {
        assert_eq!(cleared.get::<String>(key).unwrap().await.unwrap(), None);
    }
    assert_eq!(
        untouched.get::<String>("k1").unwrap().await.unwrap(),
        Some("kept".to_string())
    );
}

async fn check_get_or_insert_with(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("get_or_insert_with"))
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let value = cache
        .get_or_insert_with("k", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "computed".to_string()
        })
        .unwrap()
        .await
        .unwrap();
    assert_eq!(value, "computed");

    // 回写不等待完成，等它落地后再读
    let mut written = false;
    for _ in 0..100 {
        if cache.get::<String>("k").unwrap().await.unwrap().is_some() {
            written = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(written, "supplied value was never written back");

    let counter = calls.clone();
    let value = cache
        .get_or_insert_with("k", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "recomputed".to_string()
        })
        .unwrap()
        .await
        .unwrap();
    assert_eq!(value, "computed");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

async fn check_concurrent_put_if_absent(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("contended"))
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16u32 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.put_if_absent("k", &i).unwrap().await.unwrap()
        }));
    }

    let mut winners = 0;
    let mut observed = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            None => winners += 1,
            Some(existing) => observed.push(existing),
        }
    }
    assert_eq!(winners, 1);

    let stored = cache.get::<u32>("k").unwrap().await.unwrap().unwrap();
    assert!(observed.iter().all(|v| *v == stored));
}

async fn check_invalid_arguments(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("invalid_arguments"))
        .unwrap();

    assert!(matches!(
        cache.get::<u32>(""),
        Err(CacheError::InvalidArgument(_))
    ));
    assert!(matches!(
        cache.put("", &1u32),
        Err(CacheError::InvalidArgument(_))
    ));
    assert!(matches!(
        cache.put("k", &Option::<u32>::None),
        Err(CacheError::InvalidArgument(_))
    ));
    assert!(matches!(
        cache.put_if_absent("k", &Option::<u32>::None),
        Err(CacheError::InvalidArgument(_))
    ));
    assert!(matches!(
        cache.put_value("k", regioncache::serde_json::Value::Null),
        Err(CacheError::InvalidArgument(_))
    ));
    assert!(matches!(
        cache.invalidate(""),
        Err(CacheError::InvalidArgument(_))
    ));
    assert!(matches!(
        manager.get_cache(""),
        Err(CacheError::InvalidArgument(_))
    ));

    // 被拒绝的写入没有副作用
    assert_eq!(cache.get_value("k").unwrap().await.unwrap(), None);
}

async fn check_same_name_shares_region(manager: &CacheManager) {
    let region = common::unique_region_name("shared");
    let writer = manager.get_cache(&region).unwrap();
    let reader = manager.get_cache(&region).unwrap();

    writer.put("k", &"shared").unwrap().await.unwrap();
    assert_eq!(
        reader.get::<String>("k").unwrap().await.unwrap(),
        Some("shared".to_string())
    );
}

/// 未等待的操作仍然会执行
async fn check_dropped_pending_still_runs(manager: &CacheManager) {
    let cache = manager
        .get_cache(&common::unique_region_name("eager"))
        .unwrap();
    drop(cache.put("k", &5u8).unwrap());

    let mut seen = None;
    for _ in 0..100 {
        seen = cache.get::<u8>("k").unwrap().await.unwrap();
        if seen.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(seen, Some(5));
}

async fn check_conversion(manager: &CacheManager, conversion: ConversionType) {
    let cache = manager
        .get_cache(&common::unique_region_name("conversion"))
        .unwrap();
    cache.put("number_text", "42").unwrap().await.unwrap();
    cache.put("flag", &true).unwrap().await.unwrap();

    let as_number = cache.get::<u32>("number_text").unwrap().await.unwrap();
    let as_text = cache.get::<String>("flag").unwrap().await.unwrap();
    // 无法转换的值视为未命中，而不是错误
    let as_user = cache.get::<User>("flag").unwrap().await.unwrap();
    assert_eq!(as_user, None);

    match conversion {
        ConversionType::Lenient => {
            assert_eq!(as_number, Some(42));
            assert_eq!(as_text, Some("true".to_string()));
        }
        ConversionType::Strict => {
            assert_eq!(as_number, None);
            assert_eq!(as_text, None);
        }
    }
}

macro_rules! adapter_properties {
    ($($module:ident => $backend:expr),* $(,)?) => {
        $(
            mod $module {
                use super::*;

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_round_trip() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_round_trip(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_never_written_is_miss() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_never_written_is_miss(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_put_if_absent() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_put_if_absent(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_put_if_absent_coerces_existing() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_put_if_absent_coerces_existing(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_put_if_absent_conversion_failure() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_put_if_absent_conversion_failure(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_invalidate() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_invalidate(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_invalidate_all() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_invalidate_all(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_get_or_insert_with() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_get_or_insert_with(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_concurrent_put_if_absent() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_concurrent_put_if_absent(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_invalid_arguments() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_invalid_arguments(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_same_name_shares_region() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_same_name_shares_region(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_dropped_pending_still_runs() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_dropped_pending_still_runs(&m).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_lenient_conversion() {
                    if let Some(m) = manager($backend, ConversionType::Lenient).await {
                        check_conversion(&m, ConversionType::Lenient).await;
                    }
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn test_strict_conversion() {
                    if let Some(m) = manager($backend, ConversionType::Strict).await {
                        check_conversion(&m, ConversionType::Strict).await;
                    }
                }
            }
        )*
    };
}

adapter_properties! {
    memory => BackendType::Memory,
    local => BackendType::Local,
    redis_backend => BackendType::Redis,
}

#[tokio::test]
async fn test_memory_native_handle() {
    let manager = common::setup_manager(BackendType::Memory, ConversionType::Lenient).await;
    let cache = manager.get_cache("native_memory").unwrap();
    cache.put("k", &1u8).unwrap().await.unwrap();

    match cache.native_cache() {
        NativeCache::Memory(native) => {
            assert_eq!(native.get("k").await, Some(json!(1)));
            native.insert("direct".to_string(), json!("raw")).await;
        }
        _ => panic!("expected a memory handle"),
    }
    assert_eq!(
        cache.get::<String>("direct").unwrap().await.unwrap(),
        Some("raw".to_string())
    );
    assert!(cache.as_sync().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_local_native_handle_and_sync_view() {
    let manager = common::setup_manager(BackendType::Local, ConversionType::Lenient).await;
    let cache = manager.get_cache("native_local").unwrap();
    cache.put("k", &"async").unwrap().await.unwrap();

    match cache.native_cache() {
        NativeCache::Local(native) => assert_eq!(native.get("k"), Some(json!("async"))),
        _ => panic!("expected a local handle"),
    }

    let sync = cache.as_sync().expect("local backend exposes a sync view");
    assert_eq!(sync.get::<String>("k").unwrap(), Some("async".to_string()));
    sync.put("from_sync", &3u8).unwrap();
    assert_eq!(
        cache.get::<u8>("from_sync").unwrap().await.unwrap(),
        Some(3)
    );
}

//! Remote-pull resources: poll loop, retries and fallback over HTTP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use sailor::vault::{derive_kek, seal_secret};
use sailor::{Consumer, FetchStrategy, InitOptions, ResourceKind, ResourceOption, SailorError};

mod common;

const WAIT: Duration = Duration::from_secs(5);

fn pull(kind: ResourceKind) -> ResourceOption {
    ResourceOption::new(kind, FetchStrategy::Pull)
}

#[tokio::test]
async fn test_poll_loop_refreshes_config() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let (addr, log) = common::start_programmable_backend(move |_path| {
        let cc = cc.clone();
        async move {
            match cc.fetch_add(1, Ordering::SeqCst) {
                0 => (200, r#"{"app":"value"}"#.to_string()),
                _ => (200, r#"{"app":1}"#.to_string()),
            }
        }
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .resource(pull(ResourceKind::Config).every(Duration::from_millis(100)));

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();
    let reader = consumer.reader();
    assert_eq!(reader.get("app").unwrap(), "value");

    assert!(common::eventually(WAIT, || reader.get("app").ok() == Some(Value::from(1))).await);
    assert!(log.count("/api/v1/resource/test/billing/config") >= 2);
    assert!(reader.revision(ResourceKind::Config) >= 2);
}

#[tokio::test]
async fn test_poll_failures_keep_snapshot_and_retry() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let (addr, _log) = common::start_programmable_backend(move |_path| {
        let cc = cc.clone();
        async move {
            match cc.fetch_add(1, Ordering::SeqCst) {
                0 => (200, r#"{"app":"value"}"#.to_string()),
                1 | 2 => (503, "Service Unavailable".to_string()),
                3 => (200, "{broken".to_string()),
                _ => (200, r#"{"app":"recovered"}"#.to_string()),
            }
        }
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .resource(pull(ResourceKind::Config).every(Duration::from_millis(100)));

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();
    let reader = consumer.reader();

    // Between the failed rounds the first snapshot stays live.
    assert!(common::eventually(WAIT, || calls.load(Ordering::SeqCst) >= 3).await);
    let seen = reader.get("app").unwrap();
    assert!(seen == "value" || calls.load(Ordering::SeqCst) >= 5);

    assert!(common::eventually(WAIT, || reader.get("app").ok() == Some(Value::from("recovered"))).await);
}

#[tokio::test]
async fn test_pull_once_fetches_a_single_time() {
    let (addr, log) = common::start_programmable_backend(|_path| async move {
        (200, r#"{"app":"value"}"#.to_string())
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .resource(pull(ResourceKind::Config).once().every(Duration::from_millis(50)));

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(log.paths().len(), 1);
    assert_eq!(consumer.revision(ResourceKind::Config), 1);
}

#[tokio::test]
async fn test_primary_status_routes_to_fallback() {
    let (addr, log) = common::start_programmable_backend(|path| async move {
        match path.as_str() {
            "/billing-config.sailor.fall" => (200, r#"{"app":"cached"}"#.to_string()),
            _ => (500, "Internal Server Error".to_string()),
        }
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .fallback_base_url(format!("http://{}", addr))
        .resource(pull(ResourceKind::Config).with_fallback());

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();

    assert_eq!(consumer.reader().get("app").unwrap(), "cached");
    assert_eq!(
        log.paths(),
        vec![
            "/api/v1/resource/test/billing/config".to_string(),
            "/billing-config.sailor.fall".to_string(),
        ]
    );

    // No poll loop is started for a resource served by the fallback.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(log.paths().len(), 2);
}

#[tokio::test]
async fn test_unreachable_primary_routes_to_fallback() {
    let (fallback, _log) = common::start_programmable_backend(|path| async move {
        match path.as_str() {
            "/billing-misc.sailor.fall" => (200, "plain text".to_string()),
            _ => (404, String::new()),
        }
    })
    .await;

    let addr = common::closed_addr().await;
    let options = InitOptions::new(common::connection(addr, "billing"))
        .fallback_base_url(format!("http://{}", fallback))
        .resource(pull(ResourceKind::Misc).named("routes").with_fallback());

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();

    assert_eq!(&*consumer.reader().get_misc("routes").unwrap(), b"plain text");
}

#[tokio::test]
async fn test_fallback_without_base_is_exhausted() {
    let addr = common::closed_addr().await;
    let options = InitOptions::new(common::connection(addr, "billing"))
        .fallback_base_url("")
        .resource(pull(ResourceKind::Config).with_fallback());

    let consumer = Consumer::<Value>::new(options).unwrap();
    let err = consumer.start().await.unwrap_err();

    assert!(matches!(err, SailorError::FallbackExhausted { kind: ResourceKind::Config, .. }));
    assert!(consumer.reader().get("app").unwrap_err().is_not_loaded());
}

#[tokio::test]
async fn test_pulled_secrets_and_misc() {
    let kek = derive_kek("secret", b"access").unwrap();
    let mut records = HashMap::new();
    records.insert("db_password", seal_secret("hunter2", &kek).unwrap());
    let secrets = serde_json::to_string(&records).unwrap();

    let (addr, log) = common::start_programmable_backend(move |path| {
        let secrets = secrets.clone();
        async move {
            match path.as_str() {
                "/api/v1/resource/test/billing/secret" => (200, secrets),
                "/api/v1/resource/test/billing/misc/routes" => (200, "/a -> b".to_string()),
                _ => (404, String::new()),
            }
        }
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .resource(pull(ResourceKind::Secret).once())
        .resource(pull(ResourceKind::Misc).named("routes").once());

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();

    let reader = consumer.reader();
    assert_eq!(reader.get_secret("db_password").unwrap(), "hunter2");
    assert_eq!(&*reader.get_misc("routes").unwrap(), b"/a -> b");
    assert_eq!(
        log.paths(),
        vec![
            "/api/v1/resource/test/billing/secret".to_string(),
            "/api/v1/resource/test/billing/misc/routes".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let (addr, log) = common::start_programmable_backend(|_path| async move {
        (200, r#"{"app":"value"}"#.to_string())
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .resource(pull(ResourceKind::Config).once());

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();
    consumer.start().await.unwrap();

    assert_eq!(log.paths().len(), 1);
}

#[tokio::test]
async fn test_concurrent_start_shares_failure() {
    let (addr, log) = common::start_programmable_backend(|_path| async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        (500, "Internal Server Error".to_string())
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .resource(pull(ResourceKind::Config).once());

    let consumer = Consumer::<Value>::new(options).unwrap();
    let other = consumer.clone();
    let (first, second) = tokio::join!(consumer.start(), other.start());

    // Neither caller may report success while nothing is loaded.
    assert!(matches!(first, Err(SailorError::FallbackExhausted { .. })));
    assert!(matches!(second, Err(SailorError::FallbackExhausted { .. })));
    assert!(matches!(consumer.reader().get("app"), Err(SailorError::ConfigsNotLoaded)));
    assert_eq!(log.paths().len(), 2);
}

#[tokio::test]
async fn test_concurrent_start_waits_for_success() {
    let (addr, log) = common::start_programmable_backend(|_path| async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        (200, r#"{"app":"value"}"#.to_string())
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .resource(pull(ResourceKind::Config).once());

    let consumer = Consumer::<Value>::new(options).unwrap();
    let other = consumer.clone();
    let (first, second) = tokio::join!(consumer.start(), other.start());

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(other.reader().get("app").unwrap(), "value");
    assert_eq!(log.paths().len(), 1);
}

#[tokio::test]
async fn test_poll_failures_never_use_fallback() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let (addr, log) = common::start_programmable_backend(move |path| {
        let cc = cc.clone();
        async move {
            if path.ends_with(".sailor.fall") {
                return (200, r#"{"app":"from-fallback"}"#.to_string());
            }
            match cc.fetch_add(1, Ordering::SeqCst) {
                0 => (200, r#"{"app":"value"}"#.to_string()),
                _ => (503, "Service Unavailable".to_string()),
            }
        }
    })
    .await;

    let options = InitOptions::new(common::connection(addr, "billing"))
        .fallback_base_url(format!("http://{}", addr))
        .resource(
            pull(ResourceKind::Config)
                .every(Duration::from_millis(100))
                .with_fallback(),
        );

    let consumer = Consumer::<Value>::new(options).unwrap();
    consumer.start().await.unwrap();

    assert!(common::eventually(WAIT, || calls.load(Ordering::SeqCst) >= 4).await);
    assert!(log.paths().iter().all(|p| !p.ends_with(".sailor.fall")));
    assert_eq!(consumer.reader().get("app").unwrap(), "value");
}

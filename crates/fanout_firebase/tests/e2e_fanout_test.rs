mod fixtures;

use fanout_common::{FailureReason, RegistrationMetadata};
use fanout_firebase::models::{Target, TargetMode};
use fanout_firebase::PushError;
use fixtures::{service_with, FakeProvider};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::test]
async fn test_selected_broadcast_feeds_outcomes_back() {
    let provider = Arc::new(FakeProvider::rejecting(&[(
        "tok-B",
        FailureReason::Unregistered,
    )]));
    let service = service_with(provider.clone());

    service
        .register("tok-A", "u1", RegistrationMetadata::default())
        .await
        .unwrap();
    service
        .register("tok-B", "u2", RegistrationMetadata::default())
        .await
        .unwrap();
    assert_eq!(service.select_all(true).await, 2);

    let result = service
        .broadcast(Target::Selected, "Hi", "World", HashMap::new())
        .await
        .unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.mode, TargetMode::Selected);
    assert_eq!(result.success_count() + result.failure_count(), result.total);
    assert_eq!(result.failures[0].address, "tok-B");
    assert_eq!(result.failures[0].reason, FailureReason::Unregistered);

    let tok_a = service.get("tok-A").await.unwrap();
    let tok_b = service.get("tok-B").await.unwrap();
    assert!(tok_a.is_active);
    assert_eq!(tok_a.successful_deliveries, 1);
    assert!(!tok_b.is_active);
    assert_eq!(tok_b.failed_deliveries, 1);

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    let (addresses, message) = &calls[0];
    assert_eq!(addresses, &vec!["tok-A".to_string(), "tok-B".to_string()]);
    assert_eq!(message.title, "Hi");
    assert_eq!(message.body, "World");
    assert_eq!(message.data.get("server").map(String::as_str), Some("fanout"));

    let history = service.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].success_count, 1);
    assert_eq!(history[0].failure_count, 1);
}

#[tokio::test]
async fn test_deactivated_address_is_skipped_and_cleaned_up() {
    let provider = Arc::new(FakeProvider::rejecting(&[(
        "tok-B",
        FailureReason::InvalidToken,
    )]));
    let service = service_with(provider.clone());
    for (address, identity) in [("tok-A", "u1"), ("tok-B", "u2")] {
        service
            .register(address, identity, RegistrationMetadata::default())
            .await
            .unwrap();
    }

    service
        .broadcast(Target::All, "first", "body", HashMap::new())
        .await
        .unwrap();
    let second = service
        .broadcast(Target::All, "second", "body", HashMap::new())
        .await
        .unwrap();

    assert_eq!(second.total, 1);
    assert_eq!(provider.calls()[1].0, vec!["tok-A".to_string()]);

    assert_eq!(service.cleanup().await, 1);
    assert!(service.get("tok-B").await.is_none());
    assert_eq!(service.len().await, 1);

    // re-registering a removed address starts from scratch
    let again = service
        .register("tok-B", "u2", RegistrationMetadata::default())
        .await
        .unwrap();
    assert!(again.is_new);
    assert_eq!(again.registration.failed_deliveries, 0);
}

#[tokio::test]
async fn test_transient_failure_keeps_address_active() {
    let provider = Arc::new(FakeProvider::rejecting(&[(
        "tok-A",
        FailureReason::RateLimited,
    )]));
    let service = service_with(provider);
    service
        .register("tok-A", "u1", RegistrationMetadata::default())
        .await
        .unwrap();

    let result = service
        .broadcast(Target::All, "Hi", "World", HashMap::new())
        .await
        .unwrap();

    assert_eq!(result.failure_count(), 1);
    let registration = service.get("tok-A").await.unwrap();
    assert!(registration.is_active);
    assert_eq!(registration.failed_deliveries, 1);
}

#[tokio::test]
async fn test_broadcast_to_empty_registry_calls_no_provider() {
    let provider = Arc::new(FakeProvider::default());
    let service = service_with(provider.clone());

    let err = service
        .broadcast(Target::All, "Hi", "World", HashMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PushError::NoTargets(_)));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_large_broadcast_is_batched() {
    let provider = Arc::new(FakeProvider::default());
    let service = Arc::new(fanout_firebase::PushService::new(
        provider.clone(),
        2000,
        std::time::Duration::ZERO,
    ));
    for i in 0..1201 {
        service
            .register(&format!("token-{i:05}"), "bulk", RegistrationMetadata::default())
            .await
            .unwrap();
    }

    let result = service
        .broadcast(Target::All, "Hi", "World", HashMap::new())
        .await
        .unwrap();

    assert_eq!(result.total, 1201);
    assert_eq!(result.batches, 3);
    let sizes: Vec<usize> = provider.calls().iter().map(|(a, _)| a.len()).collect();
    assert_eq!(sizes, vec![500, 500, 201]);
    assert_eq!(service.stats().await.total_successful_deliveries, 1201);
}

#[tokio::test]
async fn test_concurrent_broadcasts_do_not_lose_counter_updates() {
    let provider = Arc::new(FakeProvider::default());
    let service = service_with(provider);
    service
        .register("tok-A", "u1", RegistrationMetadata::default())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .broadcast(Target::All, &format!("msg-{i}"), "body", HashMap::new())
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(service.get("tok-A").await.unwrap().successful_deliveries, 8);
    assert_eq!(service.history().await.len(), 8);
}

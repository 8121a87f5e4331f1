// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Binding and data-receipt behaviour through the public service API

use pulsebind_config::SamplesConfig;
use pulsebind_registry::{OwnerRef, RendezvousRegistry};
use pulsebind_services::{
    sample_id, BindOutcome, BindingService, BindingServiceImpl, Category, InMemoryRecordStore,
    LifecycleState, ReceiveOutcome, RecordStore, ServiceError,
};
use std::sync::Arc;
use std::time::Duration;

const ID: &str = "DEV1-2024-01-02-10-30-00-X";

fn build() -> (Arc<BindingServiceImpl>, Arc<InMemoryRecordStore>) {
    let registry = Arc::new(RendezvousRegistry::new(16, Duration::from_secs(300)).unwrap());
    let store = Arc::new(InMemoryRecordStore::new());
    let service = BindingServiceImpl::from_config(
        registry,
        store.clone(),
        &SamplesConfig {
            max_update_attempts: 16,
        },
    );
    (Arc::new(service), store)
}

#[tokio::test]
async fn test_bind_is_idempotent_for_same_owner_only() {
    let (service, _) = build();
    let owner_a = OwnerRef::new("ownerA");

    assert_eq!(service.bind_sample(ID, &owner_a).await.unwrap(), BindOutcome::Created);
    assert_eq!(
        service.bind_sample(ID, &owner_a).await.unwrap(),
        BindOutcome::AlreadyBound
    );
    assert!(matches!(
        service.bind_sample(ID, &OwnerRef::new("ownerB")).await,
        Err(ServiceError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_receive_data_owner_enforcement() {
    let (service, store) = build();
    let owner_a = OwnerRef::new("ownerA");
    service.bind_sample(ID, &owner_a).await.unwrap();

    assert!(matches!(
        service
            .receive_sample_data(ID, &OwnerRef::new("ownerB"), b"payload")
            .await,
        Err(ServiceError::Forbidden(_))
    ));

    assert_eq!(
        service.receive_sample_data(ID, &owner_a, b"payload").await.unwrap(),
        ReceiveOutcome::Stored
    );
    let stored = store.get(ID).await.unwrap();
    assert_eq!(stored.lifecycle_state, LifecycleState::DataReceived);
    assert_eq!(stored.payload, b"payload".to_vec());
}

#[tokio::test]
async fn test_device_resubmission_is_stored_again() {
    let (service, store) = build();
    let owner = OwnerRef::new("ownerA");
    service.bind_sample(ID, &owner).await.unwrap();

    service.receive_sample_data(ID, &owner, b"r").await.unwrap();
    let first = store.get(ID).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(
        service.receive_sample_data(ID, &owner, b"r").await.unwrap(),
        ReceiveOutcome::Stored
    );
    let second = store.get(ID).await.unwrap();
    assert!(second.timestamp > first.timestamp);

    // The feed path still recognises a redelivery
    assert_eq!(
        service.receive_feed_data(ID, &owner, b"r").await.unwrap(),
        ReceiveOutcome::Duplicate
    );
    assert_eq!(store.get(ID).await.unwrap().version, second.version);
}

#[tokio::test]
async fn test_identifier_parsing_examples() {
    assert!(sample_id::parse("badid").is_err());

    let parsed = sample_id::parse(ID).unwrap();
    assert_eq!(parsed.device_ref, "DEV1");
    assert_eq!(parsed.timestamp.to_string(), "2024-01-02 10:30:00");
}

#[tokio::test]
async fn test_classification() {
    let (service, _) = build();
    service.bind_sample(ID, &OwnerRef::new("a")).await.unwrap();

    let sample = service.classify_sample(ID, 3).await.unwrap();
    assert_eq!(sample.category, Category::Type3);
    assert!(matches!(
        service.classify_sample(ID, 99).await,
        Err(ServiceError::Format(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bind_and_receive_do_not_lose_updates() {
    for round in 0..20 {
        let (service, store) = build();
        let id = format!("DEV{}-2024-01-02-10-30-00-X", round);
        let owner = OwnerRef::new("ownerA");
        service.state_machine().create_unbound(&id).await.unwrap();

        let bind = {
            let service = Arc::clone(&service);
            let id = id.clone();
            let owner = owner.clone();
            tokio::spawn(async move { service.bind_sample(&id, &owner).await })
        };
        let receive = {
            let service = Arc::clone(&service);
            let id = id.clone();
            tokio::spawn(async move { service.receive_trusted_data(&id, b"reading").await })
        };

        bind.await.unwrap().unwrap();
        receive.await.unwrap().unwrap();

        let sample = store.get(&id).await.unwrap();
        assert_eq!(sample.owner, Some(owner));
        assert_eq!(sample.payload, b"reading".to_vec());
        assert_eq!(sample.lifecycle_state, LifecycleState::DataReceived);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_binds_single_owner_wins() {
    let (service, store) = build();

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.bind_sample(ID, &OwnerRef::new(format!("owner-{}", i))).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ServiceError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert!(store.get(ID).await.unwrap().owner.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_expired_rendezvous_cannot_be_claimed() {
    let (service, _) = build();
    service
        .register_rendezvous(ID, OwnerRef::new("a"))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(301)).await;

    assert!(matches!(
        service.claim_rendezvous(ID).await,
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        service.get_sample(ID).await,
        Err(ServiceError::NotFound { .. })
    ));
}

// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end lifecycle tests: define, set, get, describe, undefine,
//! access scoping, session closure, and restart hydration.

use std::sync::Arc;

use arcanum_config::model::StoreConfig;
use arcanum_core::{ArcanumError, DescribeOptions, UsageType};
use arcanum_session::{SecretService, Session, SessionGrants};
use arcanum_store::{MemoryBackend, SqliteBackend, ValueStore};
use secrecy::SecretString;

fn test_config() -> StoreConfig {
    StoreConfig {
        database_path: String::new(),
        wal_mode: true,
        max_value_size: 4096,
        kdf_memory_cost: 32768,
        kdf_iterations: 2,
        kdf_parallelism: 1,
    }
}

fn passphrase() -> SecretString {
    SecretString::from("lifecycle-test-pass".to_string())
}

async fn open_memory_service() -> SecretService {
    let backend = Arc::new(MemoryBackend::new());
    let store = ValueStore::create(backend, &passphrase(), &test_config())
        .await
        .unwrap();
    SecretService::open(store, 16).await.unwrap()
}

fn open_session(service: &SecretService) -> Session {
    service.open_session(SessionGrants::allow_all()).unwrap()
}

#[tokio::test]
async fn full_define_set_get_undefine_scenario() {
    let service = open_memory_service().await;
    let session = open_session(&service);

    // Define VOLUME/vol1 -> success.
    let handle = session
        .define(UsageType::Volume, "vol1", false, false)
        .await
        .unwrap();
    let u1 = handle.uuid();

    // Define the same pair again -> conflict.
    let result = session.define(UsageType::Volume, "vol1", false, false).await;
    assert!(matches!(result, Err(ArcanumError::Conflict { .. })));

    // Set and read back the value.
    session.set_value(u1, b"pw").await.unwrap();
    assert_eq!(&*session.get_value(u1).await.unwrap(), b"pw");

    // Undefine, then every path to it reports NotFound.
    session.undefine(u1).await.unwrap();
    assert!(matches!(
        session.get_value(u1).await,
        Err(ArcanumError::NotFound(_))
    ));
    assert!(matches!(
        session.lookup_by_uuid(u1),
        Err(ArcanumError::NotFound(_))
    ));
    assert!(matches!(
        session.lookup_by_usage(UsageType::Volume, "vol1"),
        Err(ArcanumError::NotFound(_))
    ));
}

#[tokio::test]
async fn defined_secret_without_value_is_value_not_set() {
    let service = open_memory_service().await;
    let session = open_session(&service);

    let handle = session
        .define(UsageType::Ceph, "client.admin", false, false)
        .await
        .unwrap();

    // The record exists; the value was never set. Distinct from NotFound.
    assert!(matches!(
        handle.get_value().await,
        Err(ArcanumError::ValueNotSet(_))
    ));
}

#[tokio::test]
async fn descriptor_never_contains_the_value() {
    let service = open_memory_service().await;
    let session = open_session(&service);

    let handle = session
        .define(UsageType::Volume, "vol-desc", false, false)
        .await
        .unwrap();
    handle.set_value(b"super-secret-bytes").await.unwrap();

    for include_private in [false, true] {
        let xml = handle
            .get_xml_desc(DescribeOptions { include_private })
            .unwrap();
        assert!(!xml.contains("super-secret-bytes"));
        assert!(xml.contains(&handle.uuid().to_string()));
    }
}

#[tokio::test]
async fn lookup_by_usage_finds_exact_pair() {
    let service = open_memory_service().await;
    let session = open_session(&service);

    let defined = session
        .define(UsageType::Iscsi, "target0", false, false)
        .await
        .unwrap();

    let found = session
        .lookup_by_usage(UsageType::Iscsi, "target0")
        .unwrap();
    assert_eq!(found.uuid(), defined.uuid());
    assert_eq!(found.usage_type(), UsageType::Iscsi);

    assert!(matches!(
        session.lookup_by_usage(UsageType::Volume, "target0"),
        Err(ArcanumError::NotFound(_))
    ));
}

#[tokio::test]
async fn list_snapshots_current_catalog() {
    let service = open_memory_service().await;
    let session = open_session(&service);

    let a = session
        .define(UsageType::Volume, "a", false, false)
        .await
        .unwrap();
    let snapshot = session.list().unwrap();

    // Mutations after the call are not reflected in the snapshot.
    session
        .define(UsageType::Volume, "b", false, false)
        .await
        .unwrap();
    assert_eq!(snapshot, vec![a.uuid()]);
    assert_eq!(session.list().unwrap().len(), 2);
}

#[tokio::test]
async fn read_only_session_cannot_mutate() {
    let service = open_memory_service().await;
    let writer = open_session(&service);
    let reader = service
        .open_session(SessionGrants::new([UsageType::Volume], true))
        .unwrap();

    let handle = writer
        .define(UsageType::Volume, "vol-ro", false, false)
        .await
        .unwrap();
    writer.set_value(handle.uuid(), b"v").await.unwrap();

    // Reads pass.
    assert_eq!(&*reader.get_value(handle.uuid()).await.unwrap(), b"v");

    // Mutations are denied and leave state untouched.
    assert!(matches!(
        reader.set_value(handle.uuid(), b"changed").await,
        Err(ArcanumError::AccessDenied(_))
    ));
    assert!(matches!(
        reader.undefine(handle.uuid()).await,
        Err(ArcanumError::AccessDenied(_))
    ));
    assert!(matches!(
        reader.define(UsageType::Volume, "new", false, false).await,
        Err(ArcanumError::AccessDenied(_))
    ));
    assert_eq!(&*writer.get_value(handle.uuid()).await.unwrap(), b"v");
}

#[tokio::test]
async fn ungranted_usage_type_is_denied() {
    let service = open_memory_service().await;
    let admin = open_session(&service);
    let volume_only = service
        .open_session(SessionGrants::new([UsageType::Volume], false))
        .unwrap();

    let ceph = admin
        .define(UsageType::Ceph, "client.admin", false, false)
        .await
        .unwrap();

    assert!(matches!(
        volume_only.get_value(ceph.uuid()).await,
        Err(ArcanumError::AccessDenied(_))
    ));
    assert!(matches!(
        volume_only.lookup_by_usage(UsageType::Ceph, "client.admin"),
        Err(ArcanumError::AccessDenied(_))
    ));

    // The catalog-level list stays visible.
    assert_eq!(volume_only.list().unwrap().len(), 1);
}

#[tokio::test]
async fn closed_session_invalidates_outstanding_handles() {
    let service = open_memory_service().await;
    let session = open_session(&service);

    let handle = session
        .define(UsageType::Volume, "vol-close", false, false)
        .await
        .unwrap();
    handle.set_value(b"v").await.unwrap();

    session.close();
    assert!(!session.is_open());

    assert!(matches!(
        handle.get_value().await,
        Err(ArcanumError::HandleClosed)
    ));
    assert!(matches!(
        handle.set_value(b"x").await,
        Err(ArcanumError::HandleClosed)
    ));
    assert!(matches!(session.list(), Err(ArcanumError::HandleClosed)));

    // Close is idempotent.
    session.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn close_during_in_flight_reads_yields_complete_or_closed() {
    let service = open_memory_service().await;
    let session = open_session(&service);

    let handle = session
        .define(UsageType::Volume, "vol-race", false, false)
        .await
        .unwrap();
    let value = vec![0xA5u8; 512];
    handle.set_value(&value).await.unwrap();

    let reader = handle.clone();
    let expected = value.clone();
    let read_task = tokio::spawn(async move {
        let mut outcomes = Vec::new();
        loop {
            match reader.get_value().await {
                Ok(bytes) => {
                    // A successful read is always the complete value.
                    assert_eq!(&*bytes, expected.as_slice());
                    outcomes.push(true);
                }
                Err(ArcanumError::HandleClosed) => {
                    outcomes.push(false);
                    return outcomes;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    });

    tokio::task::yield_now().await;
    session.close();

    let outcomes = read_task.await.unwrap();
    // Every read before closure completed; the last observed closure.
    assert_eq!(outcomes.last(), Some(&false));
}

#[tokio::test]
async fn concurrent_defines_on_one_pair_have_one_winner() {
    let service = open_memory_service().await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let session = open_session(&service);
        tasks.push(tokio::spawn(async move {
            session
                .define(UsageType::Ceph, "contested", false, false)
                .await
                .map(|h| h.uuid())
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => wins += 1,
            Err(ArcanumError::Conflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn restart_rehydrates_persisted_secrets_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.db");
    let config = test_config();

    let (persisted_uuid, ephemeral_uuid) = {
        let backend = Arc::new(
            SqliteBackend::open(path.to_str().unwrap(), true)
                .await
                .unwrap(),
        );
        let store = ValueStore::create(backend, &passphrase(), &config)
            .await
            .unwrap();
        let service = SecretService::open(store, 16).await.unwrap();
        let session = open_session(&service);

        let persisted = session
            .define(UsageType::Volume, "durable", false, false)
            .await
            .unwrap();
        persisted.set_value(b"still-here").await.unwrap();

        let ephemeral = session
            .define(UsageType::Volume, "volatile", true, false)
            .await
            .unwrap();
        ephemeral.set_value(b"gone-after-restart").await.unwrap();

        (persisted.uuid(), ephemeral.uuid())
    };

    // "Restart": reopen the backend and unlock with the same passphrase.
    let backend = Arc::new(
        SqliteBackend::open(path.to_str().unwrap(), true)
            .await
            .unwrap(),
    );
    let store = ValueStore::unlock(backend, &passphrase(), &config)
        .await
        .unwrap();
    let service = SecretService::open(store, 16).await.unwrap();
    let session = open_session(&service);

    // Persisted secret survives with its value intact.
    let survivor = session.lookup_by_uuid(persisted_uuid).unwrap();
    assert_eq!(survivor.usage_id(), "durable");
    assert_eq!(&*survivor.get_value().await.unwrap(), b"still-here");

    // Ephemeral secret left no trace.
    assert!(matches!(
        session.lookup_by_uuid(ephemeral_uuid),
        Err(ArcanumError::NotFound(_))
    ));
    assert_eq!(session.list().unwrap(), vec![persisted_uuid]);
}

#[tokio::test]
async fn undefine_frees_usage_pair_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("undef.db");
    let config = test_config();

    {
        let backend = Arc::new(
            SqliteBackend::open(path.to_str().unwrap(), true)
                .await
                .unwrap(),
        );
        let store = ValueStore::create(backend, &passphrase(), &config)
            .await
            .unwrap();
        let service = SecretService::open(store, 16).await.unwrap();
        let session = open_session(&service);

        let handle = session
            .define(UsageType::Iscsi, "reused", false, false)
            .await
            .unwrap();
        handle.set_value(b"old").await.unwrap();
        handle.undefine().await.unwrap();
    }

    let backend = Arc::new(
        SqliteBackend::open(path.to_str().unwrap(), true)
            .await
            .unwrap(),
    );
    let store = ValueStore::unlock(backend, &passphrase(), &config)
        .await
        .unwrap();
    let service = SecretService::open(store, 16).await.unwrap();
    let session = open_session(&service);

    // Nothing re-hydrated; the pair is free to claim again.
    assert!(session.list().unwrap().is_empty());
    session
        .define(UsageType::Iscsi, "reused", false, false)
        .await
        .unwrap();
}

// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the SQLite record store backend.

use std::sync::Arc;

use shadowday_store::{QueryOptions, RecordStore, SecondaryIndex, SqliteStore, StoredRecord};

async fn temp_store() -> (SqliteStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = SqliteStore::from_path(dir.path().join("store.db"))
        .await
        .expect("failed to open sqlite store");
    (store, dir)
}

fn host_record(user_id: &str) -> StoredRecord {
    let pk = format!("USER#{user_id}");
    StoredRecord::new(&pk, "PROFILE", serde_json::json!({"userId": user_id}))
        .with_index_a(format!("EMAIL#{user_id}@example.org"), &pk)
        .with_index_b("ROLE#host", &pk)
}

#[tokio::test]
async fn test_put_get_delete_round_trip() {
    let (store, _dir) = temp_store().await;

    let record = host_record("h1");
    store.put(record.clone()).await.unwrap();

    let found = store.get("USER#h1", "PROFILE").await.unwrap().unwrap();
    assert_eq!(found, record);

    store.delete("USER#h1", "PROFILE").await.unwrap();
    assert!(store.get("USER#h1", "PROFILE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_put_fully_replaces_record() {
    let (store, _dir) = temp_store().await;

    store
        .put(StoredRecord::new("K", "S", serde_json::json!({"a": 1, "b": 2})))
        .await
        .unwrap();
    store
        .put(StoredRecord::new("K", "S", serde_json::json!({"a": 3})))
        .await
        .unwrap();

    let found = store.get("K", "S").await.unwrap().unwrap();
    assert_eq!(found.attributes, serde_json::json!({"a": 3}));
    assert!(found.index_a.is_none());
}

#[tokio::test]
async fn test_index_query_orders_ascending() {
    let (store, _dir) = temp_store().await;

    for id in ["h3", "h1", "h2"] {
        store.put(host_record(id)).await.unwrap();
    }
    // A record under a different index partition must not leak in.
    store
        .put(
            StoredRecord::new("USER#s1", "PROFILE", serde_json::json!({"userId": "s1"}))
                .with_index_b("ROLE#student", "USER#s1"),
        )
        .await
        .unwrap();

    let page = store
        .query_by_index(SecondaryIndex::B, "ROLE#host", None, &QueryOptions::default())
        .await
        .unwrap();

    let pks: Vec<_> = page.records.iter().map(|r| r.pk.as_str()).collect();
    assert_eq!(pks, vec!["USER#h1", "USER#h2", "USER#h3"]);
}

#[tokio::test]
async fn test_index_query_pagination_resumes_listing() {
    let (store, _dir) = temp_store().await;

    for i in 0..7 {
        store.put(host_record(&format!("h{i}"))).await.unwrap();
    }

    let mut seen = Vec::new();
    let mut token = None;
    loop {
        let page = store
            .query_by_index(
                SecondaryIndex::B,
                "ROLE#host",
                None,
                &QueryOptions {
                    limit: Some(3),
                    start_token: token,
                },
            )
            .await
            .unwrap();
        seen.extend(page.records.iter().map(|r| r.pk.clone()));
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    assert_eq!(seen.len(), 7);
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted, "pagination must preserve ascending order");
}

#[tokio::test]
async fn test_scan_all_with_prefix_predicate() {
    let (store, _dir) = temp_store().await;

    store.put(host_record("h1")).await.unwrap();
    store
        .put(StoredRecord::new(
            "APPLICATION#a1",
            "METADATA",
            serde_json::json!({"applicationId": "a1"}),
        ))
        .await
        .unwrap();
    store
        .put(StoredRecord::new(
            "APPLICATION#a2",
            "METADATA",
            serde_json::json!({"applicationId": "a2"}),
        ))
        .await
        .unwrap();

    let applications_only = |r: &StoredRecord| r.pk.starts_with("APPLICATION#");
    let page = store
        .scan_all(Some(&applications_only), &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(page.records.len(), 2);
    assert!(page.records.iter().all(|r| r.pk.starts_with("APPLICATION#")));
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let (store, _dir) = temp_store().await;

    let result = store
        .scan_all(
            None,
            &QueryOptions {
                limit: Some(10),
                start_token: Some("@@not-a-token@@".to_string()),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(shadowday_store::StoreError::MalformedToken)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_put_if_absent_admits_single_concurrent_winner() {
    let (store, _dir) = temp_store().await;
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .put_if_absent(StoredRecord::new(
                    "APPCLAIM#s1",
                    "SEMESTER#Fall2025",
                    serde_json::json!({"attempt": i}),
                ))
                .await
                .unwrap()
        }));
    }

    let results = futures::future::join_all(handles).await;
    let winners = results
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();
    assert_eq!(winners, 1, "exactly one conditional put may succeed");
}

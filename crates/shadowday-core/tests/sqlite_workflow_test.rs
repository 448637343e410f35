// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The full matching scenario and the submission race proof against the
//! SQLite backend.

mod common;

use std::sync::Arc;

use common::*;
use shadowday_core::application_handlers::{
    handle_get_application, handle_review_application, handle_submit_application,
};
use shadowday_core::entities::{ApplicationStatus, Decision, MatchStatus};
use shadowday_core::matching::handle_create_match;
use shadowday_core::requests::{
    CreateMatchRequest, GetApplicationRequest, ReviewApplicationRequest,
    SubmitApplicationRequest,
};
use shadowday_core::state::HandlerState;
use shadowday_store::SqliteStore;

async fn sqlite_state() -> (Arc<HandlerState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = SqliteStore::from_path(dir.path().join("shadowday.db"))
        .await
        .expect("failed to open sqlite store");
    (Arc::new(HandlerState::new(Arc::new(store))), dir)
}

#[tokio::test]
async fn test_full_scenario_on_sqlite() {
    let (state, _dir) = sqlite_state().await;

    let application_id = submit(&state, "S", &["H1", "H2"], "Fall2025").await;

    handle_review_application(
        &state,
        &host("H1"),
        ReviewApplicationRequest {
            application_id: application_id.clone(),
            decision: "accept".to_string(),
            notes: "solid candidate".to_string(),
            ranking: Some(1),
        },
    )
    .await
    .unwrap();

    let first = handle_create_match(
        &state,
        &admin("a1"),
        CreateMatchRequest {
            application_id: application_id.clone(),
            host_id: "H1".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(first.match_record.status, MatchStatus::Confirmed);

    let response = handle_get_application(
        &state,
        &admin("a1"),
        GetApplicationRequest {
            application_id: application_id.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.application.status, ApplicationStatus::Matched);
    assert_eq!(response.application.matched_host_id.as_deref(), Some("H1"));
    assert_eq!(response.application.ranked_host_ids, vec!["H1", "H2"]);
    assert_eq!(response.application.reviews["H1"].decision, Decision::Accept);

    // Idempotent re-drive on the durable backend too.
    let second = handle_create_match(
        &state,
        &admin("a1"),
        CreateMatchRequest {
            application_id,
            host_id: "H1".to_string(),
        },
    )
    .await
    .unwrap();
    assert!(second.already_matched);
    assert_eq!(second.match_id, first.match_id);

    let matches = state.access.matches_for_student("S").await.unwrap();
    assert_eq!(matches.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_admit_exactly_one_on_sqlite() {
    let (state, _dir) = sqlite_state().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            handle_submit_application(
                &state,
                &student("racer"),
                SubmitApplicationRequest {
                    ranked_host_ids: vec![format!("h{i}")],
                    semester: "Fall2025".to_string(),
                    answers: serde_json::json!({}),
                    preferences: serde_json::json!({}),
                },
            )
            .await
        }));
    }

    let mut winners = 0;
    for result in futures::future::join_all(handles).await {
        match result.expect("task must not panic") {
            Ok(_) => winners += 1,
            Err(err) => assert_eq!(err.error_code(), "CONFLICT"),
        }
    }
    assert_eq!(winners, 1);

    let applications = state
        .access
        .applications_for_student("racer")
        .await
        .unwrap();
    assert_eq!(applications.len(), 1);
}

// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Directory, approval pipeline, public-read degradation, and the access
//! layer's scan fallback policy.

mod common;

use std::sync::Arc;

use common::*;
use shadowday_core::directory_handlers::{
    handle_admin_stats, handle_delete_user, handle_get_profile, handle_get_user,
    handle_public_hosts, handle_public_stats, handle_put_setting, handle_register_host_semester,
    handle_register_user, handle_search_users, handle_update_profile,
};
use shadowday_core::entities::Role;
use shadowday_core::requests::{
    AdminStatsRequest, DeleteUserRequest, GetUserRequest, ProfilePatch, PublicHostsRequest,
    PutSettingRequest, RegisterHostSemesterRequest, RegisterUserRequest, SearchUsersRequest,
    UpdateProfileRequest,
};
use shadowday_core::state::HandlerState;

/// Bring a host from registration to publicly visible: register, admin
/// approval, semester registration.
async fn onboard_host(state: &HandlerState, host_id: &str) {
    register_user(state, host_id, Role::Host).await;
    approve_user(state, host_id).await;
    handle_register_host_semester(
        state,
        &host(host_id),
        RegisterHostSemesterRequest {
            semester: Some("Fall2025".to_string()),
            max_students: 2,
            available_days: vec!["Friday".to_string()],
            experience_type: Some("both".to_string()),
            additional_info: String::new(),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let state = memory_state();
    register_user(&state, "u1", Role::Student).await;

    let err = handle_register_user(
        &state,
        RegisterUserRequest {
            user_id: "u1".to_string(),
            email: "other@example.org".to_string(),
            role: "student".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            organization: String::new(),
            job_title: String::new(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");
}

#[tokio::test]
async fn test_host_approval_pipeline_gates_public_visibility() {
    let state = memory_state();
    register_user(&state, "h1", Role::Host).await;

    // Pending, unverified, not term-registered: invisible to the public.
    let listing = handle_public_hosts(&state, PublicHostsRequest::default()).await;
    assert_eq!(listing.count, 0);

    approve_user(&state, "h1").await;
    let listing = handle_public_hosts(&state, PublicHostsRequest::default()).await;
    assert_eq!(listing.count, 0, "approval alone is not term eligibility");

    handle_register_host_semester(
        &state,
        &host("h1"),
        RegisterHostSemesterRequest {
            semester: None,
            max_students: 3,
            available_days: vec![],
            experience_type: None,
            additional_info: String::new(),
        },
    )
    .await
    .unwrap();

    let listing = handle_public_hosts(&state, PublicHostsRequest::default()).await;
    assert_eq!(listing.count, 1);
    assert_eq!(listing.hosts[0].user_id, "h1");
    assert_eq!(listing.hosts[0].max_students, 3);

    // Sensitive fields are projected away from the public shape.
    let value = serde_json::to_value(&listing.hosts[0]).unwrap();
    assert!(value.get("email").is_none());
    assert!(value.get("verified").is_none());
}

#[tokio::test]
async fn test_semester_registration_sets_single_eligibility_boolean() {
    let state = memory_state();
    register_user(&state, "h1", Role::Host).await;

    let before = state.access.get_user("h1").await.unwrap().unwrap();
    assert!(!before.host_eligible);

    handle_register_host_semester(
        &state,
        &host("h1"),
        RegisterHostSemesterRequest {
            semester: Some("Fall2025".to_string()),
            max_students: 2,
            available_days: vec![],
            experience_type: Some("virtual".to_string()),
            additional_info: String::new(),
        },
    )
    .await
    .unwrap();

    let after = state.access.get_user("h1").await.unwrap().unwrap();
    assert!(after.host_eligible);
    assert_eq!(after.max_students, 2);

    // Re-registration merges experience modes instead of failing.
    let response = handle_register_host_semester(
        &state,
        &host("h1"),
        RegisterHostSemesterRequest {
            semester: Some("Fall2025".to_string()),
            max_students: 4,
            available_days: vec![],
            experience_type: Some("in-person".to_string()),
            additional_info: String::new(),
        },
    )
    .await
    .unwrap();
    let registration = response.registration.unwrap();
    assert_eq!(registration.max_students, 4);
    assert!(
        registration.experience_types.contains(&"virtual".to_string())
            && registration
                .experience_types
                .contains(&"in-person".to_string())
    );

    // Capacity bounds are validated.
    let err = handle_register_host_semester(
        &state,
        &host("h1"),
        RegisterHostSemesterRequest {
            semester: Some("Fall2025".to_string()),
            max_students: 0,
            available_days: vec![],
            experience_type: None,
            additional_info: String::new(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_profile_update_authorization() {
    let state = memory_state();
    register_user(&state, "h1", Role::Host).await;

    // Self-update of display fields is fine.
    let response = handle_update_profile(
        &state,
        &host("h1"),
        UpdateProfileRequest {
            user_id: None,
            patch: ProfilePatch {
                bio: Some("20 years in public health".to_string()),
                ..Default::default()
            },
        },
    )
    .await
    .unwrap();
    assert_eq!(response.user.bio, "20 years in public health");

    // Admin-only fields are rejected outright for non-admins.
    let err = handle_update_profile(
        &state,
        &host("h1"),
        UpdateProfileRequest {
            user_id: None,
            patch: ProfilePatch {
                verified: Some(true),
                ..Default::default()
            },
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");

    // Another user's profile is off limits without admin.
    let err = handle_update_profile(
        &state,
        &host("h1"),
        UpdateProfileRequest {
            user_id: Some("h2".to_string()),
            patch: ProfilePatch::default(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");

    // Admin can do both.
    handle_update_profile(
        &state,
        &admin("a1"),
        UpdateProfileRequest {
            user_id: Some("h1".to_string()),
            patch: ProfilePatch {
                verified: Some(true),
                status: Some("approved".to_string()),
                ..Default::default()
            },
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_get_user_and_delete_user() {
    let state = memory_state();
    register_user(&state, "s1", Role::Student).await;

    // Self and admin can read; others cannot.
    handle_get_user(
        &state,
        &student("s1"),
        GetUserRequest {
            user_id: "s1".to_string(),
        },
    )
    .await
    .unwrap();
    let err = handle_get_user(
        &state,
        &student("s2"),
        GetUserRequest {
            user_id: "s1".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");

    // Delete is admin-only and then the profile is gone.
    let err = handle_delete_user(
        &state,
        &student("s1"),
        DeleteUserRequest {
            user_id: "s1".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");

    handle_delete_user(
        &state,
        &admin("a1"),
        DeleteUserRequest {
            user_id: "s1".to_string(),
        },
    )
    .await
    .unwrap();

    let err = handle_get_profile(&state, &student("s1")).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_search_users_requires_host_or_admin() {
    let state = memory_state();
    register_user(&state, "h1", Role::Host).await;
    register_user(&state, "h2", Role::Host).await;
    approve_user(&state, "h2").await;

    let err = handle_search_users(
        &state,
        &student("s1"),
        SearchUsersRequest {
            role: "host".to_string(),
            status: None,
            limit: None,
            next_token: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");

    let all = handle_search_users(
        &state,
        &admin("a1"),
        SearchUsersRequest {
            role: "host".to_string(),
            status: None,
            limit: None,
            next_token: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(all.count, 2);

    let approved = handle_search_users(
        &state,
        &admin("a1"),
        SearchUsersRequest {
            role: "host".to_string(),
            status: Some("approved".to_string()),
            limit: None,
            next_token: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(approved.count, 1);
    assert_eq!(approved.users[0].user_id, "h2");
}

#[tokio::test]
async fn test_admin_stats_cover_term_pipelines() {
    let state = memory_state();
    onboard_host(&state, "h1").await;

    // Current-semester override so stats target Fall2025 deterministically.
    handle_put_setting(
        &state,
        &admin("a1"),
        PutSettingRequest {
            key: "CURRENT_SEMESTER".to_string(),
            value: "Fall2025".to_string(),
        },
    )
    .await
    .unwrap();

    let app_id = submit(&state, "s1", &["h1"], "Fall2025").await;
    submit(&state, "s2", &["h1"], "Fall2025").await;
    shadowday_core::application_handlers::handle_review_application(
        &state,
        &host("h1"),
        shadowday_core::requests::ReviewApplicationRequest {
            application_id: app_id.clone(),
            decision: "accept".to_string(),
            notes: String::new(),
            ranking: None,
        },
    )
    .await
    .unwrap();
    shadowday_core::matching::handle_create_match(
        &state,
        &admin("a1"),
        shadowday_core::requests::CreateMatchRequest {
            application_id: app_id,
            host_id: "h1".to_string(),
        },
    )
    .await
    .unwrap();

    let stats = handle_admin_stats(&state, &admin("a1"), AdminStatsRequest::default())
        .await
        .unwrap();
    assert_eq!(stats.semester, "Fall2025");
    assert_eq!(stats.applications.total, 2);
    assert_eq!(stats.applications.submitted, 1);
    assert_eq!(stats.applications.matched, 1);
    assert_eq!(stats.matches.total, 1);
    assert_eq!(stats.matches.confirmed, 1);
    assert_eq!(stats.hosts.total, 1);
    assert_eq!(stats.hosts.approved, 1);
    assert_eq!(stats.hosts.registered, 1);

    let err = handle_admin_stats(&state, &host("h1"), AdminStatsRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");
}

// ============================================================================
// Fallback policy
// ============================================================================

#[tokio::test]
async fn test_index_failure_falls_back_to_scan() {
    let flaky = Arc::new(FlakyStore::new());
    let state = HandlerState::new(flaky.clone());
    register_user(&state, "h1", Role::Host).await;

    flaky.break_index_queries();

    // The indexed role query fails, the scan fallback answers.
    let listing = handle_search_users(
        &state,
        &admin("a1"),
        SearchUsersRequest {
            role: "host".to_string(),
            status: None,
            limit: None,
            next_token: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(listing.count, 1);
    assert_eq!(listing.users[0].user_id, "h1");
}

#[tokio::test]
async fn test_public_reads_degrade_to_empty_but_authenticated_paths_surface() {
    let flaky = Arc::new(FlakyStore::new());
    let state = HandlerState::new(flaky.clone());
    onboard_host(&state, "h1").await;

    // Healthy store: the host is publicly visible.
    let listing = handle_public_hosts(&state, PublicHostsRequest::default()).await;
    assert_eq!(listing.count, 1);

    flaky.break_everything();

    // Public reads degrade to empty rather than erroring.
    let listing = handle_public_hosts(&state, PublicHostsRequest::default()).await;
    assert_eq!(listing.count, 0);
    let stats = handle_public_stats(&state).await;
    assert_eq!(stats.total_hosts, 0);
    assert_eq!(stats.total_students, 0);

    // The same failure on an authenticated path surfaces.
    let err = handle_search_users(
        &state,
        &admin("a1"),
        SearchUsersRequest {
            role: "host".to_string(),
            status: None,
            limit: None,
            next_token: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
}

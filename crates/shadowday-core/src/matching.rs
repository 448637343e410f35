// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Matching engine: converts an accepted application into a confirmed
//! placement.
//!
//! Match creation touches two records in sequence - the Match record first,
//! then the Application's transition to `matched`. The two writes are not
//! atomic and no attempt is made to mask that: the compensation is that
//! `CreateMatch` is re-driveable. Re-invoking it for an application already
//! matched to the same host is a no-op success, and a Match record lost in
//! the crash window is re-created under the application's stored match id.

use chrono::Utc;
use shadowday_store::QueryOptions;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::codec;
use crate::entities::{Application, ApplicationStatus, Match, MatchStatus, Role};
use crate::error::{CoreError, Result};
use crate::identity::Caller;
use crate::requests::{
    CreateMatchRequest, CreateMatchResponse, ListMatchesRequest, ListMatchesResponse,
};
use crate::semester;
use crate::state::HandlerState;

/// Create (or idempotently re-drive) a match for an application.
///
/// # Errors
///
/// - `AuthorizationError` unless the caller is an admin
/// - `NotFound` if the application is missing
/// - `ValidationError` if the host is not among the student's ranked
///   preferences - a host may only be matched if the student ranked them
/// - `ConflictError` if the application is already matched to a different
///   host
/// - `InvalidState` if the application is withdrawn or completed
#[instrument(skip(state, caller, request), fields(application_id = %request.application_id, host_id = %request.host_id))]
pub async fn handle_create_match(
    state: &HandlerState,
    caller: &Caller,
    request: CreateMatchRequest,
) -> Result<CreateMatchResponse> {
    if !caller.is_admin() {
        return Err(CoreError::authorization("only admins can create matches"));
    }
    if request.host_id.is_empty() {
        return Err(CoreError::validation("hostId", "must not be empty"));
    }

    let mut application = state
        .access
        .get_application(&request.application_id)
        .await?
        .ok_or_else(|| CoreError::not_found("application", &request.application_id))?;

    match application.status {
        ApplicationStatus::Matched => {
            return redrive_existing_match(state, &application, &request.host_id).await;
        }
        ApplicationStatus::Completed | ApplicationStatus::Withdrawn => {
            return Err(CoreError::invalid_state(
                &application.application_id,
                application.status.as_str(),
            ));
        }
        ApplicationStatus::Submitted => {}
    }

    if !application.names_host(&request.host_id) {
        return Err(CoreError::validation(
            "hostId",
            "host is not among the student's ranked preferences",
        ));
    }

    let match_id = Uuid::new_v4().to_string();
    let match_record = Match {
        match_id: match_id.clone(),
        application_id: application.application_id.clone(),
        student_id: application.student_id.clone(),
        host_id: request.host_id.clone(),
        semester: application.semester.clone(),
        status: MatchStatus::Confirmed,
        matched_at: Utc::now(),
    };

    // Two sequential writes; a crash in between leaves a Match without a
    // matched Application. Accepted - the re-drive path above repairs it.
    state
        .store()
        .put(codec::encode_match(&match_record))
        .await?;

    application.status = ApplicationStatus::Matched;
    application.match_id = Some(match_id.clone());
    application.matched_host_id = Some(request.host_id.clone());
    application.updated_at = Utc::now();
    state
        .store()
        .put(codec::encode_application(&application))
        .await?;

    info!(match_id, "match created");

    Ok(CreateMatchResponse {
        match_id,
        match_record,
        already_matched: false,
    })
}

/// Idempotent re-drive for an already-matched application.
///
/// Same host: no-op success returning the existing match, re-creating the
/// Match record if the earlier crash window swallowed it. Different host:
/// conflict.
async fn redrive_existing_match(
    state: &HandlerState,
    application: &Application,
    host_id: &str,
) -> Result<CreateMatchResponse> {
    if application.matched_host_id.as_deref() != Some(host_id) {
        return Err(CoreError::conflict(format!(
            "application '{}' is already matched to a different host",
            application.application_id
        )));
    }

    let match_id = application.match_id.clone().ok_or_else(|| {
        CoreError::conflict(format!(
            "application '{}' is matched but carries no match id",
            application.application_id
        ))
    })?;

    let match_record = match state.access.get_match(&match_id).await? {
        Some(existing) => existing,
        None => {
            // Crash window repair: the application says matched but the
            // Match record never landed. Re-create it under the stored id.
            let repaired = Match {
                match_id: match_id.clone(),
                application_id: application.application_id.clone(),
                student_id: application.student_id.clone(),
                host_id: host_id.to_string(),
                semester: application.semester.clone(),
                status: MatchStatus::Confirmed,
                matched_at: Utc::now(),
            };
            state.store().put(codec::encode_match(&repaired)).await?;
            info!(match_id, "match record re-created on re-drive");
            repaired
        }
    };

    Ok(CreateMatchResponse {
        match_id,
        match_record,
        already_matched: true,
    })
}

/// Role-scoped match listing: admins see everything (optionally one term),
/// students and hosts see their own pairings.
#[instrument(skip(state, caller, request))]
pub async fn handle_list_matches(
    state: &HandlerState,
    caller: &Caller,
    request: ListMatchesRequest,
) -> Result<ListMatchesResponse> {
    let listing = match caller.role {
        Role::Admin => {
            let options = QueryOptions {
                limit: Some(request.limit.unwrap_or(state.default_page_limit)),
                start_token: request.next_token.clone(),
            };
            let mut listing = state.access.all_matches(&options).await?;
            if let Some(semester) = request.semester.as_deref() {
                let term = semester::normalize(semester);
                listing.items.retain(|m| m.semester == term);
            }
            listing
        }
        Role::Student => crate::access::Listing {
            items: state.access.matches_for_student(&caller.user_id).await?,
            next_token: None,
        },
        Role::Host => crate::access::Listing {
            items: state.access.matches_for_host(&caller.user_id).await?,
            next_token: None,
        },
    };

    Ok(ListMatchesResponse {
        count: listing.items.len(),
        matches: listing.items,
        next_token: listing.next_token,
    })
}

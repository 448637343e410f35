// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Application workflow handlers: submit, review, update, get, withdraw,
//! and role-scoped listing.
//!
//! The state machine is `submitted → (reviewed)* → matched → completed`,
//! with `submitted → withdrawn` as the student-initiated exit. "Reviewed"
//! is derived from review records; the stored status stays `submitted`
//! until a match is made.
//!
//! Each handler is request-scoped and holds no locks. The two documented
//! write races are handled structurally: duplicate submission is closed by
//! a conditional claim put, and reviews are stored as per-host records so
//! concurrent reviewers cannot overwrite each other.

use chrono::Utc;
use shadowday_store::QueryOptions;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::codec;
use crate::entities::{Application, ApplicationStatus, Decision, Review, Role};
use crate::error::{CoreError, Result};
use crate::identity::Caller;
use crate::requests::{
    ApplicationResponse, GetApplicationRequest, ListApplicationsRequest,
    ListApplicationsResponse, ReviewApplicationRequest, ReviewApplicationResponse,
    SubmitApplicationRequest, SubmitApplicationResponse, UpdateApplicationRequest,
    WithdrawApplicationRequest,
};
use crate::semester;
use crate::state::HandlerState;

/// Upper bound on ranked host preferences per application.
pub const MAX_RANKED_HOSTS: usize = 5;

/// Validate a ranked host list: non-empty, at most five entries, all unique.
fn validate_ranked_hosts(ranked_host_ids: &[String]) -> Result<()> {
    if ranked_host_ids.is_empty() {
        return Err(CoreError::validation(
            "rankedHostIds",
            "at least one host preference is required",
        ));
    }
    if ranked_host_ids.len() > MAX_RANKED_HOSTS {
        return Err(CoreError::validation(
            "rankedHostIds",
            format!("at most {MAX_RANKED_HOSTS} hosts may be ranked"),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for host_id in ranked_host_ids {
        if host_id.is_empty() {
            return Err(CoreError::validation(
                "rankedHostIds",
                "host ids must not be empty",
            ));
        }
        if !seen.insert(host_id.as_str()) {
            return Err(CoreError::validation(
                "rankedHostIds",
                format!("host '{host_id}' is ranked more than once"),
            ));
        }
    }
    Ok(())
}

fn require_object(value: &serde_json::Value, field: &str) -> Result<()> {
    if value.is_object() {
        Ok(())
    } else {
        Err(CoreError::validation(field, "must be a JSON object"))
    }
}

/// Load an application or fail `NotFound`.
async fn load_application(state: &HandlerState, application_id: &str) -> Result<Application> {
    state
        .access
        .get_application(application_id)
        .await?
        .ok_or_else(|| CoreError::not_found("application", application_id))
}

/// Flip the student profile's `applicationSubmitted` flag. Best-effort: a
/// missing profile is skipped, matching the registration flow where the
/// profile is created by the identity collaborator.
async fn mark_application_submitted(
    state: &HandlerState,
    student_id: &str,
    submitted: bool,
) -> Result<()> {
    if let Some(mut user) = state.access.get_user(student_id).await? {
        user.application_submitted = submitted;
        user.updated_at = Utc::now();
        state.store().put(codec::encode_user(&user)).await?;
    }
    Ok(())
}

// ============================================================================
// Submit
// ============================================================================

/// Handle an application submission.
///
/// # Errors
///
/// - `AuthorizationError` unless the caller is a student
/// - `ValidationError` for a bad ranked list or empty semester
/// - `ConflictError` when a non-withdrawn application already exists for
///   this `(student, semester)` - enforced twice: a friendly query-then-check
///   (which alone would race) and the conditional claim put that actually
///   closes the race
#[instrument(skip(state, caller, request), fields(student_id = %caller.user_id))]
pub async fn handle_submit_application(
    state: &HandlerState,
    caller: &Caller,
    request: SubmitApplicationRequest,
) -> Result<SubmitApplicationResponse> {
    if caller.role != Role::Student {
        return Err(CoreError::authorization(
            "only students can submit applications",
        ));
    }

    validate_ranked_hosts(&request.ranked_host_ids)?;
    require_object(&request.answers, "answers")?;
    require_object(&request.preferences, "preferences")?;

    let term = semester::normalize(&request.semester);
    if term.is_empty() {
        return Err(CoreError::validation("semester", "must not be empty"));
    }

    // Friendly pre-check. Not atomic with the write; the claim below is the
    // actual uniqueness guarantee.
    let existing = state
        .access
        .applications_for_student(&caller.user_id)
        .await?;
    if existing
        .iter()
        .any(|app| app.semester == term && app.status != ApplicationStatus::Withdrawn)
    {
        return Err(CoreError::conflict(format!(
            "an application already exists for semester '{term}'"
        )));
    }

    let application_id = Uuid::new_v4().to_string();

    // Conditional claim on (student, semester): exactly one of N concurrent
    // submissions wins this put.
    let claim = codec::encode_claim(&caller.user_id, &term, &application_id);
    if !state.store().put_if_absent(claim).await? {
        return Err(CoreError::conflict(format!(
            "an application already exists for semester '{term}'"
        )));
    }

    let now = Utc::now();
    let application = Application {
        application_id: application_id.clone(),
        student_id: caller.user_id.clone(),
        ranked_host_ids: request.ranked_host_ids,
        semester: term.clone(),
        answers: request.answers,
        preferences: request.preferences,
        status: ApplicationStatus::Submitted,
        reviews: Default::default(),
        match_id: None,
        matched_host_id: None,
        submitted_at: now,
        updated_at: now,
    };
    state
        .store()
        .put(codec::encode_application(&application))
        .await?;

    mark_application_submitted(state, &caller.user_id, true).await?;

    info!(application_id, semester = %term, "application submitted");

    Ok(SubmitApplicationResponse {
        application_id,
        status: ApplicationStatus::Submitted,
    })
}

// ============================================================================
// Review
// ============================================================================

/// Handle a host's (or admin's) review of an application.
///
/// The review is written as its own record keyed by
/// `(applicationId, hostId)`: last-write-wins per host key, and concurrent
/// reviews from different hosts never contend on the application record.
///
/// # Errors
///
/// - `AuthorizationError` unless the caller is host-or-admin, and for hosts
///   unless they appear in the application's ranked preferences
/// - `NotFound` for a missing application
/// - `ValidationError` for a decision outside accept/reject/maybe
#[instrument(skip(state, caller, request), fields(application_id = %request.application_id, reviewer = %caller.user_id))]
pub async fn handle_review_application(
    state: &HandlerState,
    caller: &Caller,
    request: ReviewApplicationRequest,
) -> Result<ReviewApplicationResponse> {
    if !caller.has_role(&[Role::Host, Role::Admin]) {
        return Err(CoreError::authorization(
            "only hosts and admins can review applications",
        ));
    }

    let application = load_application(state, &request.application_id).await?;

    if caller.role == Role::Host && !application.names_host(&caller.user_id) {
        return Err(CoreError::authorization(
            "host is not named in this application's ranked preferences",
        ));
    }

    let decision = Decision::parse(&request.decision).ok_or_else(|| {
        CoreError::validation("decision", "must be one of accept, reject, maybe")
    })?;

    let review = Review {
        host_id: caller.user_id.clone(),
        decision,
        notes: request.notes,
        ranking: request.ranking,
        reviewed_at: Utc::now(),
    };
    state
        .store()
        .put(codec::encode_review(&application.application_id, &review))
        .await?;

    info!(decision = decision.as_str(), "review recorded");

    Ok(ReviewApplicationResponse {
        application_id: application.application_id,
        review,
    })
}

// ============================================================================
// Update
// ============================================================================

/// Handle a student's update of their own application.
///
/// # Errors
///
/// - `NotFound` for a missing application
/// - `InvalidState` when the application is matched, completed, or
///   withdrawn - checked first, so a closed application answers the same
///   way regardless of caller role
/// - `AuthorizationError` unless the caller is the owning student
/// - `ValidationError` for a bad replacement ranked list or non-object
///   answers/preferences (immutable fields are already unrepresentable in
///   the typed patch)
#[instrument(skip(state, caller, request), fields(application_id = %request.application_id))]
pub async fn handle_update_application(
    state: &HandlerState,
    caller: &Caller,
    request: UpdateApplicationRequest,
) -> Result<ApplicationResponse> {
    let mut application = load_application(state, &request.application_id).await?;

    if application.status.is_terminal() || application.status == ApplicationStatus::Withdrawn {
        return Err(CoreError::invalid_state(
            &application.application_id,
            application.status.as_str(),
        ));
    }

    if caller.role != Role::Student || caller.user_id != application.student_id {
        return Err(CoreError::authorization(
            "only the owning student can update this application",
        ));
    }

    let patch = request.patch;
    if let Some(ranked_host_ids) = patch.ranked_host_ids {
        validate_ranked_hosts(&ranked_host_ids)?;
        application.ranked_host_ids = ranked_host_ids;
    }
    if let Some(answers) = patch.answers {
        require_object(&answers, "answers")?;
        application.answers = answers;
    }
    if let Some(preferences) = patch.preferences {
        require_object(&preferences, "preferences")?;
        application.preferences = preferences;
    }
    application.updated_at = Utc::now();

    state
        .store()
        .put(codec::encode_application(&application))
        .await?;

    application.reviews = state
        .access
        .reviews_for_application(&application.application_id)
        .await?;

    Ok(ApplicationResponse { application })
}

// ============================================================================
// Get
// ============================================================================

/// Fetch one application with its reviews merged in.
///
/// Visible to the owning student, to any host named in the ranked
/// preferences, and to admins.
#[instrument(skip(state, caller, request), fields(application_id = %request.application_id))]
pub async fn handle_get_application(
    state: &HandlerState,
    caller: &Caller,
    request: GetApplicationRequest,
) -> Result<ApplicationResponse> {
    let mut application = load_application(state, &request.application_id).await?;

    let is_owner = caller.user_id == application.student_id;
    let is_named_host = caller.role == Role::Host && application.names_host(&caller.user_id);
    if !is_owner && !is_named_host && !caller.is_admin() {
        return Err(CoreError::authorization(
            "not authorized to view this application",
        ));
    }

    application.reviews = state
        .access
        .reviews_for_application(&application.application_id)
        .await?;

    Ok(ApplicationResponse { application })
}

// ============================================================================
// Withdraw
// ============================================================================

/// Handle a student's withdrawal of a submitted application.
///
/// Releases the submission claim so the student may submit again for the
/// term, and clears the profile's `applicationSubmitted` flag.
#[instrument(skip(state, caller, request), fields(application_id = %request.application_id))]
pub async fn handle_withdraw_application(
    state: &HandlerState,
    caller: &Caller,
    request: WithdrawApplicationRequest,
) -> Result<ApplicationResponse> {
    let mut application = load_application(state, &request.application_id).await?;

    if caller.role != Role::Student || caller.user_id != application.student_id {
        return Err(CoreError::authorization(
            "only the owning student can withdraw this application",
        ));
    }
    if application.status != ApplicationStatus::Submitted {
        return Err(CoreError::invalid_state(
            &application.application_id,
            application.status.as_str(),
        ));
    }

    application.status = ApplicationStatus::Withdrawn;
    application.updated_at = Utc::now();
    state
        .store()
        .put(codec::encode_application(&application))
        .await?;

    // Release the per-term claim; a fresh submission may take it again.
    let (claim_pk, claim_sk) = codec::claim_key(&application.student_id, &application.semester);
    state.store().delete(&claim_pk, &claim_sk).await?;

    mark_application_submitted(state, &application.student_id, false).await?;

    info!("application withdrawn");

    Ok(ApplicationResponse { application })
}

// ============================================================================
// List
// ============================================================================

/// Role-scoped application listing.
///
/// Students see their own applications, hosts see applications naming them
/// (the explicit scan path), admins see a term via the semester index or
/// everything via prefix scan.
#[instrument(skip(state, caller, request))]
pub async fn handle_list_applications(
    state: &HandlerState,
    caller: &Caller,
    request: ListApplicationsRequest,
) -> Result<ListApplicationsResponse> {
    let status_filter = request
        .status
        .as_deref()
        .map(|status| {
            ApplicationStatus::parse(status)
                .ok_or_else(|| CoreError::validation("status", "unknown application status"))
        })
        .transpose()?;

    let options = QueryOptions {
        limit: Some(request.limit.unwrap_or(state.default_page_limit)),
        start_token: request.next_token.clone(),
    };

    let listing = match caller.role {
        Role::Student => {
            let items = state
                .access
                .applications_for_student(&caller.user_id)
                .await?;
            crate::access::Listing {
                items,
                next_token: None,
            }
        }
        Role::Host => {
            state
                .access
                .applications_for_host(&caller.user_id, &options)
                .await?
        }
        Role::Admin => match request.semester.as_deref() {
            Some(semester) => {
                let term = semester::normalize(semester);
                state
                    .access
                    .applications_for_semester(&term, &options)
                    .await?
            }
            None => state.access.all_applications(&options).await?,
        },
    };

    let applications: Vec<Application> = listing
        .items
        .into_iter()
        .filter(|app| status_filter.is_none_or(|status| app.status == status))
        .collect();

    if applications.is_empty() && listing.next_token.is_some() {
        // A fully-filtered page is not the end of the listing; the caller
        // continues with the token.
        warn!("page fully filtered, caller should continue with next_token");
    }

    Ok(ListApplicationsResponse {
        count: applications.len(),
        applications,
        next_token: listing.next_token,
    })
}

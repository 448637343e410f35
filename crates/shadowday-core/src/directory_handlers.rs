// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Directory and profile handlers: registration, profile updates, the host
//! approval pipeline, semester registration, and the public/admin read
//! surfaces.
//!
//! Public (unauthenticated) reads degrade to empty results on store
//! failure - never an error, an availability-over-correctness choice scoped
//! strictly to anonymous traffic. Authenticated paths surface
//! `StoreUnavailable` like everything else.

use chrono::Utc;
use shadowday_store::QueryOptions;
use tracing::{info, instrument, warn};

use crate::codec;
use crate::entities::{
    ApplicationStatus, MatchStatus, Role, SemesterRegistration, Setting, User, UserStatus,
};
use crate::error::{CoreError, Result};
use crate::identity::Caller;
use crate::requests::{
    AdminStatsRequest, AdminStatsResponse, ApplicationStats, DeleteUserRequest,
    DeleteUserResponse, GetHostSemesterRequest, GetSettingRequest, GetUserRequest,
    HostSemesterResponse, HostStats, MatchStats, ProfilePatch, ProfileResponse, PublicHost,
    PublicHostsRequest, PublicHostsResponse, PublicStatsResponse, PutSettingRequest,
    RegisterHostSemesterRequest, RegisterUserRequest, SearchUsersRequest, SearchUsersResponse,
    SetUserStatusRequest, SettingResponse, UpdateProfileRequest, UserResponse,
};
use crate::semester;
use crate::state::HandlerState;

/// Host capacity bounds per term.
const MAX_STUDENTS_PER_HOST: u32 = 10;

async fn load_user(state: &HandlerState, user_id: &str) -> Result<User> {
    state
        .access
        .get_user(user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("user", user_id))
}

// ============================================================================
// Registration & profiles
// ============================================================================

/// Register a new user profile.
///
/// Anonymous in core terms: the identity collaborator has already vouched
/// for the user id. The profile is created conditionally, so a duplicate
/// registration is a conflict rather than a silent overwrite. Hosts start
/// in the `pending` approval state; students and admins are approved
/// implicitly.
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn handle_register_user(
    state: &HandlerState,
    request: RegisterUserRequest,
) -> Result<UserResponse> {
    if request.user_id.is_empty() {
        return Err(CoreError::validation("userId", "must not be empty"));
    }
    if request.email.is_empty() {
        return Err(CoreError::validation("email", "must not be empty"));
    }
    let role = Role::parse(&request.role)
        .ok_or_else(|| CoreError::validation("role", "must be one of student, host, admin"))?;

    let now = Utc::now();
    let user = User {
        user_id: request.user_id.clone(),
        role,
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        organization: request.organization,
        job_title: request.job_title,
        status: match role {
            Role::Host => UserStatus::Pending,
            Role::Student | Role::Admin => UserStatus::Approved,
        },
        verified: role != Role::Host,
        created_at: now,
        updated_at: now,
        ..User::fallback()
    };

    if !state.store().put_if_absent(codec::encode_user(&user)).await? {
        return Err(CoreError::conflict(format!(
            "user '{}' is already registered",
            user.user_id
        )));
    }

    info!(role = role.as_str(), "user registered");

    Ok(UserResponse { user })
}

/// Fetch the caller's own profile. For hosts, the current term's
/// registration rides along when present; a failure fetching it does not
/// fail the profile read.
#[instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn handle_get_profile(state: &HandlerState, caller: &Caller) -> Result<ProfileResponse> {
    let user = load_user(state, &caller.user_id).await?;
    let current_semester = state.access.current_semester().await;

    let registration = if user.role == Role::Host {
        match state
            .access
            .get_registration(&user.user_id, &current_semester)
            .await
        {
            Ok(registration) => registration,
            Err(err) => {
                warn!(error = %err, "semester registration unavailable for profile read");
                None
            }
        }
    } else {
        None
    };

    Ok(ProfileResponse {
        user,
        current_semester,
        registration,
    })
}

/// Fetch a user by id: self, or any user as admin.
#[instrument(skip(state, caller, request), fields(user_id = %request.user_id))]
pub async fn handle_get_user(
    state: &HandlerState,
    caller: &Caller,
    request: GetUserRequest,
) -> Result<UserResponse> {
    if caller.user_id != request.user_id && !caller.is_admin() {
        return Err(CoreError::authorization(
            "not authorized to view this profile",
        ));
    }
    let user = load_user(state, &request.user_id).await?;
    Ok(UserResponse { user })
}

/// Update a profile: own, or any as admin.
///
/// `verified` and `status` are admin-only; a non-admin patching them is
/// rejected explicitly rather than silently stripped.
#[instrument(skip(state, caller, request))]
pub async fn handle_update_profile(
    state: &HandlerState,
    caller: &Caller,
    request: UpdateProfileRequest,
) -> Result<UserResponse> {
    let target_id = request.user_id.as_deref().unwrap_or(&caller.user_id);
    if target_id != caller.user_id && !caller.is_admin() {
        return Err(CoreError::authorization(
            "not authorized to update this profile",
        ));
    }

    let patch = request.patch;
    if !caller.is_admin() && (patch.verified.is_some() || patch.status.is_some()) {
        return Err(CoreError::authorization(
            "verified and status can only be changed by an admin",
        ));
    }

    let mut user = load_user(state, target_id).await?;
    apply_profile_patch(&mut user, patch)?;
    user.updated_at = Utc::now();

    state.store().put(codec::encode_user(&user)).await?;
    info!(user_id = %user.user_id, "profile updated");

    Ok(UserResponse { user })
}

fn apply_profile_patch(user: &mut User, patch: ProfilePatch) -> Result<()> {
    if let Some(email) = patch.email {
        if email.is_empty() {
            return Err(CoreError::validation("email", "must not be empty"));
        }
        user.email = email;
    }
    if let Some(first_name) = patch.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = patch.last_name {
        user.last_name = last_name;
    }
    if let Some(organization) = patch.organization {
        user.organization = organization;
    }
    if let Some(job_title) = patch.job_title {
        user.job_title = job_title;
    }
    if let Some(industry) = patch.industry {
        user.industry = industry;
    }
    if let Some(location) = patch.location {
        user.location = location;
    }
    if let Some(bio) = patch.bio {
        user.bio = bio;
    }
    if let Some(max_students) = patch.max_students {
        user.max_students = max_students;
    }
    if let Some(verified) = patch.verified {
        user.verified = verified;
    }
    if let Some(status) = patch.status {
        user.status = UserStatus::parse(&status)
            .ok_or_else(|| CoreError::validation("status", "unknown user status"))?;
    }
    Ok(())
}

/// Admin approval workflow: `approved` implies `verified = true`,
/// `rejected` implies `verified = false`.
#[instrument(skip(state, caller, request), fields(user_id = %request.user_id))]
pub async fn handle_set_user_status(
    state: &HandlerState,
    caller: &Caller,
    request: SetUserStatusRequest,
) -> Result<UserResponse> {
    if !caller.is_admin() {
        return Err(CoreError::authorization("only admins can set user status"));
    }
    let status = UserStatus::parse(&request.status)
        .ok_or_else(|| CoreError::validation("status", "unknown user status"))?;

    let mut user = load_user(state, &request.user_id).await?;
    user.status = status;
    match status {
        UserStatus::Approved => user.verified = true,
        UserStatus::Rejected => user.verified = false,
        UserStatus::Pending => {}
    }
    user.updated_at = Utc::now();

    state.store().put(codec::encode_user(&user)).await?;
    info!(status = status.as_str(), "user status updated");

    Ok(UserResponse { user })
}

/// Admin: delete a user profile.
#[instrument(skip(state, caller, request), fields(user_id = %request.user_id))]
pub async fn handle_delete_user(
    state: &HandlerState,
    caller: &Caller,
    request: DeleteUserRequest,
) -> Result<DeleteUserResponse> {
    if !caller.is_admin() {
        return Err(CoreError::authorization("only admins can delete users"));
    }
    // Existence check so a bad id is NotFound rather than silent success.
    load_user(state, &request.user_id).await?;

    let (pk, sk) = codec::user_key(&request.user_id);
    state.store().delete(&pk, &sk).await?;
    info!("user deleted");

    Ok(DeleteUserResponse {
        user_id: request.user_id,
    })
}

/// Search users by role (host-or-admin), optionally filtered by pipeline
/// status, paginated.
#[instrument(skip(state, caller, request))]
pub async fn handle_search_users(
    state: &HandlerState,
    caller: &Caller,
    request: SearchUsersRequest,
) -> Result<SearchUsersResponse> {
    if !caller.has_role(&[Role::Host, Role::Admin]) {
        return Err(CoreError::authorization("not authorized to search users"));
    }
    let role = Role::parse(&request.role)
        .ok_or_else(|| CoreError::validation("role", "must be one of student, host, admin"))?;
    let status_filter = request
        .status
        .as_deref()
        .filter(|s| *s != "all")
        .map(|s| {
            UserStatus::parse(s)
                .ok_or_else(|| CoreError::validation("status", "unknown user status"))
        })
        .transpose()?;

    let options = QueryOptions {
        limit: Some(request.limit.unwrap_or(state.default_page_limit)),
        start_token: request.next_token.clone(),
    };
    let listing = state.access.users_by_role(role, &options).await?;

    let users: Vec<User> = listing
        .items
        .into_iter()
        .filter(|user| status_filter.is_none_or(|status| user.status == status))
        .collect();

    Ok(SearchUsersResponse {
        count: users.len(),
        users,
        next_token: listing.next_token,
    })
}

// ============================================================================
// Semester registration
// ============================================================================

/// Register (or merge into) a host's capacity registration for a term.
///
/// Sets the profile's single `host_eligible` boolean - the one place term
/// eligibility is computed and stored.
#[instrument(skip(state, caller, request), fields(host_id = %caller.user_id))]
pub async fn handle_register_host_semester(
    state: &HandlerState,
    caller: &Caller,
    request: RegisterHostSemesterRequest,
) -> Result<HostSemesterResponse> {
    if caller.role != Role::Host {
        return Err(CoreError::authorization(
            "only hosts can register for a semester",
        ));
    }
    if request.max_students == 0 || request.max_students > MAX_STUDENTS_PER_HOST {
        return Err(CoreError::validation(
            "maxStudents",
            format!("must be between 1 and {MAX_STUDENTS_PER_HOST}"),
        ));
    }

    let term = match request.semester.as_deref() {
        Some(semester) => semester::normalize(semester),
        None => state.access.current_semester().await,
    };
    if term.is_empty() {
        return Err(CoreError::validation("semester", "must not be empty"));
    }

    let incoming_types: Vec<String> = match request.experience_type.as_deref() {
        Some("both") => vec!["in-person".to_string(), "virtual".to_string()],
        Some(other) if !other.is_empty() => vec![other.to_string()],
        _ => vec!["in-person".to_string()],
    };

    let now = Utc::now();
    let registration = match state.access.get_registration(&caller.user_id, &term).await? {
        Some(mut existing) => {
            // Re-registration merges experience modes rather than failing.
            for mode in incoming_types {
                if !existing.experience_types.contains(&mode) {
                    existing.experience_types.push(mode);
                }
            }
            existing.max_students = request.max_students;
            if !request.available_days.is_empty() {
                existing.available_days = request.available_days;
            }
            if !request.additional_info.is_empty() {
                existing.additional_info = request.additional_info;
            }
            existing.updated_at = now;
            existing
        }
        None => SemesterRegistration {
            user_id: caller.user_id.clone(),
            semester: term.clone(),
            max_students: request.max_students,
            available_days: request.available_days,
            experience_types: incoming_types,
            additional_info: request.additional_info,
            created_at: now,
            updated_at: now,
        },
    };

    state
        .store()
        .put(codec::encode_registration(&registration))
        .await?;

    // Term eligibility is this single stored boolean, set here and nowhere
    // else.
    if let Some(mut user) = state.access.get_user(&caller.user_id).await? {
        user.host_eligible = true;
        user.max_students = registration.max_students;
        user.updated_at = now;
        state.store().put(codec::encode_user(&user)).await?;
    }

    info!(semester = %term, "host registered for semester");

    Ok(HostSemesterResponse {
        registered: true,
        registration: Some(registration),
        semester: term,
    })
}

/// Fetch the caller's registration for a term (default: current term).
#[instrument(skip(state, caller, request), fields(host_id = %caller.user_id))]
pub async fn handle_get_host_semester(
    state: &HandlerState,
    caller: &Caller,
    request: GetHostSemesterRequest,
) -> Result<HostSemesterResponse> {
    let term = match request.semester.as_deref() {
        Some(semester) => semester::normalize(semester),
        None => state.access.current_semester().await,
    };

    let registration = state.access.get_registration(&caller.user_id, &term).await?;

    Ok(HostSemesterResponse {
        registered: registration.is_some(),
        registration,
        semester: term,
    })
}

// ============================================================================
// Public reads (degrade, never fail)
// ============================================================================

/// Anonymous host directory: verified, approved, term-eligible hosts with
/// sensitive fields projected away. Store failures degrade to an empty
/// listing.
#[instrument(skip(state, request))]
pub async fn handle_public_hosts(
    state: &HandlerState,
    request: PublicHostsRequest,
) -> PublicHostsResponse {
    let hosts: Vec<PublicHost> = state
        .access
        .public_users_by_role(Role::Host)
        .await
        .iter()
        .filter(|user| user.verified && user.status == UserStatus::Approved && user.host_eligible)
        .filter(|user| {
            request
                .industry
                .as_deref()
                .is_none_or(|needle| user.industry.contains(needle))
        })
        .filter(|user| {
            request
                .location
                .as_deref()
                .is_none_or(|needle| user.location.contains(needle))
        })
        .map(PublicHost::from)
        .collect();

    PublicHostsResponse {
        count: hosts.len(),
        hosts,
    }
}

/// Anonymous aggregate statistics. Each count independently degrades to
/// zero on failure.
#[instrument(skip(state))]
pub async fn handle_public_stats(state: &HandlerState) -> PublicStatsResponse {
    let students = state.access.public_users_by_role(Role::Student).await;
    let hosts = state.access.public_users_by_role(Role::Host).await;
    let verified_hosts = hosts.iter().filter(|h| h.verified).count();

    PublicStatsResponse {
        total_students: students.len(),
        total_hosts: hosts.len(),
        verified_hosts,
        current_semester: state.access.current_semester().await,
    }
}

// ============================================================================
// Admin reads
// ============================================================================

/// Admin statistics for a term: application pipeline, match pipeline, host
/// approval breakdown.
#[instrument(skip(state, caller, request))]
pub async fn handle_admin_stats(
    state: &HandlerState,
    caller: &Caller,
    request: AdminStatsRequest,
) -> Result<AdminStatsResponse> {
    if !caller.is_admin() {
        return Err(CoreError::authorization("only admins can view statistics"));
    }
    let term = match request.semester.as_deref() {
        Some(semester) => semester::normalize(semester),
        None => state.access.current_semester().await,
    };

    let applications = state
        .access
        .applications_for_semester(&term, &QueryOptions::default())
        .await?
        .items;

    let mut application_stats = ApplicationStats {
        total: applications.len(),
        ..Default::default()
    };
    for application in &applications {
        match application.status {
            ApplicationStatus::Submitted => {
                application_stats.submitted += 1;
                // "Reviewed" is derived, never stored: a submitted
                // application with at least one review record.
                let reviews = state
                    .access
                    .reviews_for_application(&application.application_id)
                    .await?;
                if !reviews.is_empty() {
                    application_stats.reviewed += 1;
                }
            }
            ApplicationStatus::Matched => application_stats.matched += 1,
            ApplicationStatus::Completed => application_stats.completed += 1,
            ApplicationStatus::Withdrawn => application_stats.withdrawn += 1,
        }
    }

    let matches = state
        .access
        .all_matches(&QueryOptions::default())
        .await?
        .items;
    let mut match_stats = MatchStats::default();
    for m in matches.iter().filter(|m| m.semester == term) {
        match_stats.total += 1;
        match m.status {
            MatchStatus::Confirmed => match_stats.confirmed += 1,
            MatchStatus::Completed => match_stats.completed += 1,
            MatchStatus::Cancelled => match_stats.cancelled += 1,
        }
    }

    let hosts = state
        .access
        .users_by_role(Role::Host, &QueryOptions::default())
        .await?
        .items;
    let registered = state
        .access
        .hosts_registered_for_semester(&term)
        .await?
        .len();
    let host_stats = HostStats {
        total: hosts.len(),
        pending: hosts
            .iter()
            .filter(|h| h.status == UserStatus::Pending)
            .count(),
        approved: hosts
            .iter()
            .filter(|h| h.status == UserStatus::Approved)
            .count(),
        rejected: hosts
            .iter()
            .filter(|h| h.status == UserStatus::Rejected)
            .count(),
        registered,
    };

    Ok(AdminStatsResponse {
        semester: term,
        applications: application_stats,
        matches: match_stats,
        hosts: host_stats,
    })
}

// ============================================================================
// Settings
// ============================================================================

/// Fetch a setting (admin). An absent setting reads as empty.
#[instrument(skip(state, caller, request), fields(key = %request.key))]
pub async fn handle_get_setting(
    state: &HandlerState,
    caller: &Caller,
    request: GetSettingRequest,
) -> Result<SettingResponse> {
    if !caller.is_admin() {
        return Err(CoreError::authorization("only admins can read settings"));
    }
    let setting = state.access.get_setting(&request.key).await?;
    Ok(SettingResponse {
        key: request.key,
        value: setting.map(|s| s.value).unwrap_or_default(),
    })
}

/// Create or replace a setting (admin).
#[instrument(skip(state, caller, request), fields(key = %request.key))]
pub async fn handle_put_setting(
    state: &HandlerState,
    caller: &Caller,
    request: PutSettingRequest,
) -> Result<SettingResponse> {
    if !caller.is_admin() {
        return Err(CoreError::authorization("only admins can change settings"));
    }
    if request.key.is_empty() {
        return Err(CoreError::validation("key", "must not be empty"));
    }

    let setting = Setting {
        key: request.key.clone(),
        value: request.value.clone(),
        updated_at: Utc::now(),
    };
    state.store().put(codec::encode_setting(&setting)).await?;
    info!("setting updated");

    Ok(SettingResponse {
        key: setting.key,
        value: setting.value,
    })
}

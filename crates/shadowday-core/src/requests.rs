// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed request and response shapes, one pair per operation, plus the
//! tagged-union dispatch surface the Request Routing collaborator uses.
//!
//! The core never sees loosely-typed path/method input: routing deserializes
//! into one of these variants before calling [`dispatch`]. Unknown fields in
//! patch payloads are rejected at deserialization, which is how immutable
//! fields stay immutable.

use serde::{Deserialize, Serialize};

use crate::application_handlers;
use crate::directory_handlers;
use crate::entities::{
    Application, ApplicationStatus, Match, Review, SemesterRegistration, User, empty_object,
};
use crate::error::{CoreError, Result};
use crate::identity::Caller;
use crate::matching;
use crate::state::HandlerState;

// ============================================================================
// Application workflow
// ============================================================================

/// Submit a new application for a term.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationRequest {
    /// Ranked host preferences, most preferred first (1..=5, unique).
    pub ranked_host_ids: Vec<String>,
    /// The term applied for; normalized before storage.
    pub semester: String,
    /// Free-form questionnaire answers.
    #[serde(default = "empty_object")]
    pub answers: serde_json::Value,
    /// Free-form scheduling/experience preferences.
    #[serde(default = "empty_object")]
    pub preferences: serde_json::Value,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationResponse {
    /// The fresh application id.
    pub application_id: String,
    /// Always `submitted` on success.
    pub status: ApplicationStatus,
}

/// Record a host's review of an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewApplicationRequest {
    /// The application under review.
    pub application_id: String,
    /// `accept`, `reject`, or `maybe`; anything else is a validation error.
    pub decision: String,
    #[serde(default)]
    pub notes: String,
    /// Optional preference ranking of this applicant.
    #[serde(default)]
    pub ranking: Option<u32>,
}

/// Result of a recorded review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewApplicationResponse {
    /// The reviewed application.
    pub application_id: String,
    /// The review as stored.
    pub review: Review,
}

/// Student-editable application fields. Immutable fields (`applicationId`,
/// `studentId`, `status`, ...) are unrepresentable here and unknown fields
/// are rejected at deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplicationPatch {
    /// Replacement ranked host list; revalidated like a submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranked_host_ids: Option<Vec<String>>,
    /// Replacement answers object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<serde_json::Value>,
    /// Replacement preferences object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<serde_json::Value>,
}

/// Update an application before it is matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    /// The application to update.
    pub application_id: String,
    /// The fields to change.
    pub patch: ApplicationPatch,
}

/// Fetch one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetApplicationRequest {
    /// The application to fetch.
    pub application_id: String,
}

/// An application with its reviews merged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    /// The application.
    pub application: Application,
}

/// Withdraw a submitted application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawApplicationRequest {
    /// The application to withdraw.
    pub application_id: String,
}

/// Role-scoped application listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApplicationsRequest {
    /// Admin only: restrict to a term (uses the semester index).
    #[serde(default)]
    pub semester: Option<String>,
    /// Restrict to a stored status.
    #[serde(default)]
    pub status: Option<String>,
    /// Page size; the configured default applies when absent.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Continuation token from a previous page.
    #[serde(default)]
    pub next_token: Option<String>,
}

/// One page of applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApplicationsResponse {
    /// Applications in this page.
    pub applications: Vec<Application>,
    /// Count of applications in this page.
    pub count: usize,
    /// Continuation token to resume the listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

// ============================================================================
// Matching
// ============================================================================

/// Convert an application into a confirmed match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    /// The application to match.
    pub application_id: String,
    /// The chosen host; must appear in the student's ranked preferences.
    pub host_id: String,
}

/// Result of match creation (or of an idempotent re-drive).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchResponse {
    /// The match id.
    pub match_id: String,
    /// The match record.
    #[serde(rename = "match")]
    pub match_record: Match,
    /// True when the application was already matched and this call was a
    /// no-op re-drive.
    pub already_matched: bool,
}

/// Role-scoped match listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMatchesRequest {
    /// Admin only: restrict to a term.
    #[serde(default)]
    pub semester: Option<String>,
    /// Page size for the admin listing.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Continuation token from a previous page.
    #[serde(default)]
    pub next_token: Option<String>,
}

/// One page of matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMatchesResponse {
    /// Matches in this page.
    pub matches: Vec<Match>,
    /// Count of matches in this page.
    pub count: usize,
    /// Continuation token to resume the listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

// ============================================================================
// Directory & profiles
// ============================================================================

/// Register a new user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    /// The new user's id (from the identity collaborator).
    pub user_id: String,
    /// Contact email.
    pub email: String,
    /// `student`, `host`, or `admin`.
    pub role: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub job_title: String,
}

/// A single user payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// The user profile.
    pub user: User,
}

/// The caller's own profile, with the host's current-term registration
/// attached when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    /// The profile.
    pub user: User,
    /// The effective current term.
    pub current_semester: String,
    /// The host's registration for the current term, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<SemesterRegistration>,
}

/// Fetch a user by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserRequest {
    /// The user to fetch.
    pub user_id: String,
}

/// Self-or-admin profile edits. `verified` and `status` are admin-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_students: Option<u32>,
    /// Admin-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Admin-only: `pending`, `approved`, or `rejected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Update a profile (own, or any as admin).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    /// Target user; defaults to the caller.
    #[serde(default)]
    pub user_id: Option<String>,
    /// The fields to change.
    pub patch: ProfilePatch,
}

/// Admin approval workflow: set a user's pipeline status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserStatusRequest {
    /// The user whose status changes.
    pub user_id: String,
    /// `pending`, `approved`, or `rejected`.
    pub status: String,
}

/// Admin: remove a user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    /// The user to delete.
    pub user_id: String,
}

/// Acknowledgement of a deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    /// The deleted user id.
    pub user_id: String,
}

/// Search users by role (host-or-admin).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersRequest {
    /// The role to list; required.
    pub role: String,
    /// Restrict to a pipeline status.
    #[serde(default)]
    pub status: Option<String>,
    /// Page size; the configured default applies when absent.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Continuation token from a previous page.
    #[serde(default)]
    pub next_token: Option<String>,
}

/// One page of users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersResponse {
    /// Users in this page.
    pub users: Vec<User>,
    /// Count of users in this page.
    pub count: usize,
    /// Continuation token to resume the listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// Host capacity registration for a term.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterHostSemesterRequest {
    /// The term; defaults to the effective current term.
    #[serde(default)]
    pub semester: Option<String>,
    /// Capacity, 1..=10.
    pub max_students: u32,
    #[serde(default)]
    pub available_days: Vec<String>,
    /// `in-person`, `virtual`, or `both`.
    #[serde(default)]
    pub experience_type: Option<String>,
    #[serde(default)]
    pub additional_info: String,
}

/// The stored registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSemesterResponse {
    /// Whether a registration exists for the term.
    pub registered: bool,
    /// The registration, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<SemesterRegistration>,
    /// The term queried.
    pub semester: String,
}

/// Query the caller's registration for a term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHostSemesterRequest {
    /// The term; defaults to the effective current term.
    #[serde(default)]
    pub semester: Option<String>,
}

// ============================================================================
// Public & admin reads
// ============================================================================

/// Anonymous host directory listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHostsRequest {
    /// Substring filter on industry.
    #[serde(default)]
    pub industry: Option<String>,
    /// Substring filter on location.
    #[serde(default)]
    pub location: Option<String>,
}

/// A host as shown to anonymous traffic: sensitive contact fields are
/// projected away.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHost {
    /// The host's user id.
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub organization: String,
    pub industry: String,
    pub location: String,
    pub bio: String,
    /// Capacity for the current term.
    pub max_students: u32,
}

impl From<&User> for PublicHost {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            job_title: user.job_title.clone(),
            organization: user.organization.clone(),
            industry: user.industry.clone(),
            location: user.location.clone(),
            bio: user.bio.clone(),
            max_students: user.max_students,
        }
    }
}

/// The anonymous host directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHostsResponse {
    /// Visible hosts.
    pub hosts: Vec<PublicHost>,
    /// Count of visible hosts.
    pub count: usize,
}

/// Anonymous aggregate statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStatsResponse {
    pub total_students: usize,
    pub total_hosts: usize,
    pub verified_hosts: usize,
    /// The effective current term.
    pub current_semester: String,
}

/// Admin statistics for a term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsRequest {
    /// The term; defaults to the effective current term.
    #[serde(default)]
    pub semester: Option<String>,
}

/// Application pipeline counts for a term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStats {
    pub total: usize,
    pub submitted: usize,
    /// Derived: submitted applications with at least one review.
    pub reviewed: usize,
    pub matched: usize,
    pub completed: usize,
    pub withdrawn: usize,
}

/// Match counts for a term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub total: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Host approval pipeline counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Hosts registered for the term in question.
    pub registered: usize,
}

/// Admin statistics payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    /// The term the statistics cover.
    pub semester: String,
    pub applications: ApplicationStats,
    pub matches: MatchStats,
    pub hosts: HostStats,
}

/// Fetch a setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSettingRequest {
    /// Setting key.
    pub key: String,
}

/// Create or replace a setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutSettingRequest {
    /// Setting key.
    pub key: String,
    /// Setting value.
    pub value: String,
}

/// A setting payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingResponse {
    /// Setting key.
    pub key: String,
    /// Setting value; empty when the setting is absent.
    pub value: String,
}

// ============================================================================
// Dispatch
// ============================================================================

/// Every core operation as one tagged variant, dispatched by the Request
/// Routing collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    /// Submit an application.
    SubmitApplication(SubmitApplicationRequest),
    /// Review an application.
    ReviewApplication(ReviewApplicationRequest),
    /// Update an application.
    UpdateApplication(UpdateApplicationRequest),
    /// Fetch an application.
    GetApplication(GetApplicationRequest),
    /// Withdraw an application.
    WithdrawApplication(WithdrawApplicationRequest),
    /// List applications, role-scoped.
    ListApplications(ListApplicationsRequest),
    /// Create a match from an application.
    CreateMatch(CreateMatchRequest),
    /// List matches, role-scoped.
    ListMatches(ListMatchesRequest),
    /// Register a user profile (anonymous; identity collaborator vouches).
    RegisterUser(RegisterUserRequest),
    /// Fetch the caller's own profile.
    GetProfile,
    /// Fetch a user by id.
    GetUser(GetUserRequest),
    /// Update a profile.
    UpdateProfile(UpdateProfileRequest),
    /// Admin: approve/reject a user.
    SetUserStatus(SetUserStatusRequest),
    /// Admin: delete a user profile.
    DeleteUser(DeleteUserRequest),
    /// Search users by role.
    SearchUsers(SearchUsersRequest),
    /// Host: register capacity for a term.
    RegisterHostSemester(RegisterHostSemesterRequest),
    /// Host: fetch own registration for a term.
    GetHostSemester(GetHostSemesterRequest),
    /// Anonymous host directory.
    PublicHosts(PublicHostsRequest),
    /// Anonymous aggregate statistics.
    PublicStats,
    /// Admin statistics for a term.
    AdminStats(AdminStatsRequest),
    /// Fetch a setting (admin).
    GetSetting(GetSettingRequest),
    /// Create or replace a setting (admin).
    PutSetting(PutSettingRequest),
}

fn to_payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn require_caller(caller: Option<&Caller>) -> Result<&Caller> {
    caller.ok_or_else(|| CoreError::Unauthenticated {
        reason: "this operation requires a caller identity".to_string(),
    })
}

/// Dispatch one typed request to its handler.
///
/// `caller` is `None` for anonymous traffic; operations that require an
/// identity fail `Unauthenticated`. Public read operations never require
/// one.
pub async fn dispatch(
    state: &HandlerState,
    caller: Option<&Caller>,
    request: ApiRequest,
) -> Result<serde_json::Value> {
    match request {
        ApiRequest::SubmitApplication(req) => {
            let caller = require_caller(caller)?;
            application_handlers::handle_submit_application(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::ReviewApplication(req) => {
            let caller = require_caller(caller)?;
            application_handlers::handle_review_application(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::UpdateApplication(req) => {
            let caller = require_caller(caller)?;
            application_handlers::handle_update_application(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::GetApplication(req) => {
            let caller = require_caller(caller)?;
            application_handlers::handle_get_application(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::WithdrawApplication(req) => {
            let caller = require_caller(caller)?;
            application_handlers::handle_withdraw_application(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::ListApplications(req) => {
            let caller = require_caller(caller)?;
            application_handlers::handle_list_applications(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::CreateMatch(req) => {
            let caller = require_caller(caller)?;
            matching::handle_create_match(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::ListMatches(req) => {
            let caller = require_caller(caller)?;
            matching::handle_list_matches(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::RegisterUser(req) => directory_handlers::handle_register_user(state, req)
            .await
            .map(|r| to_payload(&r)),
        ApiRequest::GetProfile => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_get_profile(state, caller)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::GetUser(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_get_user(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::UpdateProfile(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_update_profile(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::SetUserStatus(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_set_user_status(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::DeleteUser(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_delete_user(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::SearchUsers(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_search_users(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::RegisterHostSemester(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_register_host_semester(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::GetHostSemester(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_get_host_semester(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::PublicHosts(req) => Ok(to_payload(
            &directory_handlers::handle_public_hosts(state, req).await,
        )),
        ApiRequest::PublicStats => Ok(to_payload(
            &directory_handlers::handle_public_stats(state).await,
        )),
        ApiRequest::AdminStats(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_admin_stats(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::GetSetting(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_get_setting(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
        ApiRequest::PutSetting(req) => {
            let caller = require_caller(caller)?;
            directory_handlers::handle_put_setting(state, caller, req)
                .await
                .map(|r| to_payload(&r))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_request_tagged_deserialization() {
        let request: ApiRequest = serde_json::from_value(serde_json::json!({
            "op": "submit_application",
            "rankedHostIds": ["h1", "h2"],
            "semester": "Fall2025"
        }))
        .unwrap();

        match request {
            ApiRequest::SubmitApplication(req) => {
                assert_eq!(req.ranked_host_ids, vec!["h1", "h2"]);
                assert_eq!(req.semester, "Fall2025");
                assert!(req.answers.is_object());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_unit_operations_deserialize() {
        let request: ApiRequest =
            serde_json::from_value(serde_json::json!({"op": "public_stats"})).unwrap();
        assert!(matches!(request, ApiRequest::PublicStats));
    }

    #[test]
    fn test_patch_rejects_immutable_fields() {
        let result: std::result::Result<ApplicationPatch, _> =
            serde_json::from_value(serde_json::json!({
                "studentId": "someone-else",
                "answers": {}
            }));
        assert!(result.is_err(), "immutable fields must be rejected");
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let result: std::result::Result<ApiRequest, _> =
            serde_json::from_value(serde_json::json!({"op": "drop_table"}));
        assert!(result.is_err());
    }
}

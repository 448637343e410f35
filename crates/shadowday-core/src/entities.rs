// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain entities: users, applications, reviews, matches, and the records
//! that support them.
//!
//! Every struct deserializes defensively: optional display fields take
//! defaults so a partially-populated stored record still decodes (see the
//! codec module for the full decode-with-defaults contract).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Empty JSON object, the serde default for free-form attribute maps.
pub(crate) fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A student applying for shadowing placements.
    #[default]
    Student,
    /// A professional hosting shadowing experiences.
    Host,
    /// A program administrator.
    Admin,
}

impl Role {
    /// Stable string form, matching the stored role index key suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Host => "host",
            Self::Admin => "admin",
        }
    }

    /// Parse a role string; `None` for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "host" => Some(Self::Host),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application lifecycle status.
///
/// "Reviewed" is deliberately not a status: it is derived from the presence
/// of review records and the stored status stays `submitted` until a match
/// is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    /// Submitted and awaiting review/matching.
    #[default]
    Submitted,
    /// Matched to a host; terminal for student edits.
    Matched,
    /// Experience completed; terminal.
    Completed,
    /// Withdrawn by the student.
    Withdrawn,
}

impl ApplicationStatus {
    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Matched => "matched",
            Self::Completed => "completed",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// Parse a status string; `None` for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(Self::Submitted),
            "matched" => Some(Self::Matched),
            "completed" => Some(Self::Completed),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    /// Whether student edits are closed (ownership has passed to the
    /// administrative process).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matched | Self::Completed)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host's review decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Host accepts the applicant.
    Accept,
    /// Host rejects the applicant.
    Reject,
    /// Host is undecided; defensive decode default.
    #[default]
    Maybe,
}

impl Decision {
    /// Parse a decision string; `None` for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accept" => Some(Self::Accept),
            "reject" => Some(Self::Reject),
            "maybe" => Some(Self::Maybe),
            _ => None,
        }
    }

    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Maybe => "maybe",
        }
    }
}

/// User account pipeline status (host approval workflow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Awaiting administrator review.
    #[default]
    Pending,
    /// Approved for participation.
    Approved,
    /// Rejected by an administrator.
    Rejected,
}

impl UserStatus {
    /// Parse a status string; `None` for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Match lifecycle status. Created as `confirmed`; later lifecycle is
/// governed by this field alone, the rest of the match is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Pairing confirmed by an administrator.
    #[default]
    Confirmed,
    /// Experience completed.
    Completed,
    /// Pairing cancelled.
    Cancelled,
}

/// A user profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier.
    #[serde(default)]
    pub user_id: String,
    /// Role, fixed at registration.
    #[serde(default)]
    pub role: Role,
    /// Contact email; also the index-A lookup key.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
    /// Approval pipeline status (meaningful for hosts).
    #[serde(default)]
    pub status: UserStatus,
    /// Set by administrator approval.
    #[serde(default)]
    pub verified: bool,
    /// Whether the host is eligible for the current term.
    ///
    /// Single boolean, computed and stored when the host registers for a
    /// semester; replaces legacy multi-flag eligibility checks.
    #[serde(default)]
    pub host_eligible: bool,
    /// Whether the student has a live application this term.
    #[serde(default)]
    pub application_submitted: bool,
    /// Host capacity for the current term.
    #[serde(default)]
    pub max_students: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Minimal profile used when a stored record cannot be interpreted at
    /// all; identity fields are recovered from the record key by the codec.
    pub(crate) fn fallback() -> Self {
        let now = Utc::now();
        Self {
            user_id: String::new(),
            role: Role::default(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            organization: String::new(),
            job_title: String::new(),
            industry: String::new(),
            location: String::new(),
            bio: String::new(),
            status: UserStatus::default(),
            verified: false,
            host_eligible: false,
            application_submitted: false,
            max_students: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A host's review of one application. One per host per application,
/// last-write-wins per host key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// The reviewing host.
    #[serde(default)]
    pub host_id: String,
    /// Accept/reject/maybe.
    #[serde(default)]
    pub decision: Decision,
    #[serde(default)]
    pub notes: String,
    /// Host's preference ranking of this applicant, if given.
    #[serde(default)]
    pub ranking: Option<u32>,
    #[serde(default = "Utc::now")]
    pub reviewed_at: DateTime<Utc>,
}

/// A student's ranked host-preference submission for one semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Unique application identifier.
    #[serde(default)]
    pub application_id: String,
    /// The owning student.
    #[serde(default)]
    pub student_id: String,
    /// Ranked host preferences, most preferred first. Length 1..=5, entries
    /// unique, order preserved end-to-end.
    #[serde(default)]
    pub ranked_host_ids: Vec<String>,
    /// The term this application is scoped to.
    #[serde(default)]
    pub semester: String,
    /// Free-form questionnaire answers.
    #[serde(default = "empty_object")]
    pub answers: serde_json::Value,
    /// Free-form scheduling/experience preferences.
    #[serde(default = "empty_object")]
    pub preferences: serde_json::Value,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Reviews keyed by host id. Stored as separate records and merged in
    /// on read; never persisted on this record.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reviews: BTreeMap<String, Review>,
    /// Set at the match transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    /// Set at the match transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_host_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Whether the given host appears in the student's ranked preferences.
    pub fn names_host(&self, host_id: &str) -> bool {
        self.ranked_host_ids.iter().any(|id| id == host_id)
    }

    /// Derived condition: one or more reviews present. Not a stored status.
    pub fn is_reviewed(&self) -> bool {
        !self.reviews.is_empty()
    }

    pub(crate) fn fallback() -> Self {
        let now = Utc::now();
        Self {
            application_id: String::new(),
            student_id: String::new(),
            ranked_host_ids: Vec::new(),
            semester: String::new(),
            answers: empty_object(),
            preferences: empty_object(),
            status: ApplicationStatus::default(),
            reviews: BTreeMap::new(),
            match_id: None,
            matched_host_id: None,
            submitted_at: now,
            updated_at: now,
        }
    }
}

/// A confirmed student/host pairing, created exactly once per application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Unique match identifier.
    #[serde(default)]
    pub match_id: String,
    /// The application this match was created from.
    #[serde(default)]
    pub application_id: String,
    /// The matched student.
    #[serde(default)]
    pub student_id: String,
    /// The matched host.
    #[serde(default)]
    pub host_id: String,
    /// The term this match is scoped to.
    #[serde(default)]
    pub semester: String,
    /// Later lifecycle; everything else is immutable after creation.
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default = "Utc::now")]
    pub matched_at: DateTime<Utc>,
}

/// A host's capacity registration for one term.
///
/// Creating or updating one sets the profile's `host_eligible` boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterRegistration {
    /// The registering host.
    #[serde(default)]
    pub user_id: String,
    /// Normalized term label (e.g. `Fall2025`).
    #[serde(default)]
    pub semester: String,
    /// How many students the host can take this term.
    #[serde(default)]
    pub max_students: u32,
    #[serde(default)]
    pub available_days: Vec<String>,
    /// Offered experience modes (e.g. `in-person`, `virtual`).
    #[serde(default)]
    pub experience_types: Vec<String>,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// An administrator-maintained setting (e.g. the current-semester override).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    /// Setting key.
    #[serde(default)]
    pub key: String,
    /// Setting value.
    #[serde(default)]
    pub value: String,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Entity codec: the pure mapping between domain entities and the flat
//! key/attribute record shape the store persists.
//!
//! Index keys are a deterministic function of entity state: the role index
//! key is always `ROLE#<role>`, the semester index key is always
//! `SEMESTER#<semester>`, and so on. Decoding is total - a partially
//! populated or unrecognized record never fails, it degrades to an entity
//! with defensive defaults and identity fields recovered from the primary
//! key. Backward-compatible reads are this module's job, not the call
//! sites'.

use serde::Serialize;
use serde::de::DeserializeOwned;
use shadowday_store::StoredRecord;

use crate::entities::{
    Application, Match, Review, Role, SemesterRegistration, Setting, User, empty_object,
};

/// Primary-key prefix for user profiles.
pub const USER_PREFIX: &str = "USER#";
/// Sort key of user profile records.
pub const PROFILE_SK: &str = "PROFILE";
/// Primary-key prefix for applications.
pub const APPLICATION_PREFIX: &str = "APPLICATION#";
/// Sort key of application and match metadata records.
pub const METADATA_SK: &str = "METADATA";
/// Sort-key prefix for per-host review records.
pub const REVIEW_SK_PREFIX: &str = "REVIEW#";
/// Primary-key prefix for matches.
pub const MATCH_PREFIX: &str = "MATCH#";
/// Primary-key prefix for submission claims (the per-term uniqueness marker).
pub const CLAIM_PREFIX: &str = "APPCLAIM#";
/// Primary key of the settings partition.
pub const SETTINGS_PK: &str = "SETTINGS";
/// Key prefix for semester-scoped keys.
pub const SEMESTER_PREFIX: &str = "SEMESTER#";
/// Index-key prefix for student-scoped lookups.
pub const STUDENT_PREFIX: &str = "STUDENT#";
/// Index-key prefix for host-scoped lookups.
pub const HOST_PREFIX: &str = "HOST#";
/// Index-key prefix for role-scoped lookups.
pub const ROLE_PREFIX: &str = "ROLE#";
/// Index-key prefix for email lookups.
pub const EMAIL_PREFIX: &str = "EMAIL#";

/// The role index key for a role (`ROLE#host`).
pub fn role_index_key(role: Role) -> String {
    format!("{ROLE_PREFIX}{role}")
}

/// The semester index key for a term (`SEMESTER#Fall2025`).
pub fn semester_index_key(semester: &str) -> String {
    format!("{SEMESTER_PREFIX}{semester}")
}

/// The student index key (`STUDENT#<id>`).
pub fn student_index_key(student_id: &str) -> String {
    format!("{STUDENT_PREFIX}{student_id}")
}

/// The host index key (`HOST#<id>`).
pub fn host_index_key(host_id: &str) -> String {
    format!("{HOST_PREFIX}{host_id}")
}

/// Primary composite key of a user profile.
pub fn user_key(user_id: &str) -> (String, String) {
    (format!("{USER_PREFIX}{user_id}"), PROFILE_SK.to_string())
}

/// Primary composite key of an application.
pub fn application_key(application_id: &str) -> (String, String) {
    (
        format!("{APPLICATION_PREFIX}{application_id}"),
        METADATA_SK.to_string(),
    )
}

/// Primary composite key of a match.
pub fn match_key(match_id: &str) -> (String, String) {
    (format!("{MATCH_PREFIX}{match_id}"), METADATA_SK.to_string())
}

/// Primary composite key of a submission claim.
pub fn claim_key(student_id: &str, semester: &str) -> (String, String) {
    (
        format!("{CLAIM_PREFIX}{student_id}"),
        format!("{SEMESTER_PREFIX}{semester}"),
    )
}

/// Primary composite key of a host's semester registration.
pub fn registration_key(user_id: &str, semester: &str) -> (String, String) {
    (
        format!("{USER_PREFIX}{user_id}"),
        format!("{SEMESTER_PREFIX}{semester}"),
    )
}

/// Primary composite key of a setting.
pub fn setting_key(key: &str) -> (String, String) {
    (SETTINGS_PK.to_string(), key.to_string())
}

fn attributes_of<T: Serialize>(entity: &T) -> serde_json::Value {
    serde_json::to_value(entity).unwrap_or_else(|_| empty_object())
}

fn decode_or<T: DeserializeOwned>(record: &StoredRecord, fallback: impl FnOnce() -> T) -> T {
    serde_json::from_value(record.attributes.clone()).unwrap_or_else(|_| fallback())
}

fn id_from_key(key: &str, prefix: &str) -> String {
    key.strip_prefix(prefix).unwrap_or(key).to_string()
}

/// Encode a user profile. Indexed by email (A) and role (B).
pub fn encode_user(user: &User) -> StoredRecord {
    let (pk, sk) = user_key(&user.user_id);
    StoredRecord::new(&pk, sk, attributes_of(user))
        .with_index_a(format!("{EMAIL_PREFIX}{}", user.email), &pk)
        .with_index_b(role_index_key(user.role), &pk)
}

/// Decode a user profile with defensive defaults.
pub fn decode_user(record: &StoredRecord) -> User {
    let mut user = decode_or(record, User::fallback);
    if user.user_id.is_empty() {
        user.user_id = id_from_key(&record.pk, USER_PREFIX);
    }
    user
}

/// Encode an application. Indexed by student (A) and semester (B).
///
/// The in-memory `reviews` map is never persisted here; reviews live in
/// their own records so concurrent hosts cannot overwrite each other.
pub fn encode_application(application: &Application) -> StoredRecord {
    let mut stripped = application.clone();
    stripped.reviews.clear();

    let (pk, sk) = application_key(&application.application_id);
    StoredRecord::new(&pk, sk, attributes_of(&stripped))
        .with_index_a(student_index_key(&application.student_id), &pk)
        .with_index_b(semester_index_key(&application.semester), &pk)
}

/// Decode an application with defensive defaults.
pub fn decode_application(record: &StoredRecord) -> Application {
    let mut application = decode_or(record, Application::fallback);
    if application.application_id.is_empty() {
        application.application_id = id_from_key(&record.pk, APPLICATION_PREFIX);
    }
    application
}

/// Encode a review as its own record keyed by `(applicationId, hostId)`.
///
/// Shares the application's partition; index A makes per-application review
/// assembly an indexed lookup.
pub fn encode_review(application_id: &str, review: &Review) -> StoredRecord {
    let pk = format!("{APPLICATION_PREFIX}{application_id}");
    let sk = format!("{REVIEW_SK_PREFIX}{}", review.host_id);
    StoredRecord::new(&pk, &sk, attributes_of(review)).with_index_a(&pk, &sk)
}

/// Decode a review with defensive defaults.
pub fn decode_review(record: &StoredRecord) -> Review {
    let mut review: Review = decode_or(record, || Review {
        host_id: String::new(),
        decision: Default::default(),
        notes: String::new(),
        ranking: None,
        reviewed_at: chrono::Utc::now(),
    });
    if review.host_id.is_empty() {
        review.host_id = id_from_key(&record.sk, REVIEW_SK_PREFIX);
    }
    review
}

/// Encode the submission claim for `(studentId, semester)`.
///
/// Written with a conditional put; its existence is the store-level
/// uniqueness constraint behind "one non-withdrawn application per student
/// per term".
pub fn encode_claim(student_id: &str, semester: &str, application_id: &str) -> StoredRecord {
    let (pk, sk) = claim_key(student_id, semester);
    StoredRecord::new(
        pk,
        sk,
        serde_json::json!({
            "studentId": student_id,
            "semester": semester,
            "applicationId": application_id,
        }),
    )
}

/// Encode a match. Indexed by student (A) and host (B).
pub fn encode_match(m: &Match) -> StoredRecord {
    let (pk, sk) = match_key(&m.match_id);
    StoredRecord::new(&pk, sk, attributes_of(m))
        .with_index_a(student_index_key(&m.student_id), &pk)
        .with_index_b(host_index_key(&m.host_id), &pk)
}

/// Decode a match with defensive defaults.
pub fn decode_match(record: &StoredRecord) -> Match {
    let mut m: Match = decode_or(record, || Match {
        match_id: String::new(),
        application_id: String::new(),
        student_id: String::new(),
        host_id: String::new(),
        semester: String::new(),
        status: Default::default(),
        matched_at: chrono::Utc::now(),
    });
    if m.match_id.is_empty() {
        m.match_id = id_from_key(&record.pk, MATCH_PREFIX);
    }
    m
}

/// Encode a host's semester registration. Index B groups registrations for
/// a term under the host role partition.
pub fn encode_registration(registration: &SemesterRegistration) -> StoredRecord {
    let (pk, sk) = registration_key(&registration.user_id, &registration.semester);
    StoredRecord::new(pk, &sk, attributes_of(registration))
        .with_index_b(role_index_key(Role::Host), &sk)
}

/// Decode a semester registration with defensive defaults.
pub fn decode_registration(record: &StoredRecord) -> SemesterRegistration {
    let mut registration: SemesterRegistration = decode_or(record, || SemesterRegistration {
        user_id: String::new(),
        semester: String::new(),
        max_students: 0,
        available_days: Vec::new(),
        experience_types: Vec::new(),
        additional_info: String::new(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    });
    if registration.user_id.is_empty() {
        registration.user_id = id_from_key(&record.pk, USER_PREFIX);
    }
    if registration.semester.is_empty() {
        registration.semester = id_from_key(&record.sk, SEMESTER_PREFIX);
    }
    registration
}

/// Encode a setting.
pub fn encode_setting(setting: &Setting) -> StoredRecord {
    let (pk, sk) = setting_key(&setting.key);
    StoredRecord::new(pk, sk, attributes_of(setting))
}

/// Decode a setting with defensive defaults.
pub fn decode_setting(record: &StoredRecord) -> Setting {
    let mut setting: Setting = decode_or(record, || Setting {
        key: String::new(),
        value: String::new(),
        updated_at: chrono::Utc::now(),
    });
    if setting.key.is_empty() {
        setting.key = record.sk.clone();
    }
    setting
}

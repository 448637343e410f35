// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Access-pattern layer: one parameterized query template per role-scoped
//! view the workflow needs.
//!
//! This layer absorbs the store's lack of query flexibility. Every indexed
//! query that fails falls back once to a full scan with an equivalent
//! predicate before surfacing an error; the `public_*` variants additionally
//! degrade to empty results so anonymous listing reads never fail.
//!
//! The host-application lookup (`applications_for_host`) is deliberately a
//! full-table scan: no index is keyed by member-of-list membership, so
//! "applications whose ranked list contains this host" is O(table size).
//! That cost is explicit here rather than hidden behind an index that does
//! not exist.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use shadowday_store::{
    Page, QueryOptions, RecordFilter, RecordStore, SecondaryIndex, StoreError, StoredRecord,
};
use tracing::warn;

use crate::codec;
use crate::entities::{Application, Match, Review, Role, SemesterRegistration, Setting, User};
use crate::error::{CoreError, Result};
use crate::semester;

/// Setting key holding the administrator's current-semester override.
pub const CURRENT_SEMESTER_KEY: &str = "CURRENT_SEMESTER";

/// One page of decoded entities.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    /// Decoded entities in this page.
    pub items: Vec<T>,
    /// Opaque continuation token, echoed back unmodified to resume.
    pub next_token: Option<String>,
}

impl<T> Listing<T> {
    fn from_page(page: Page, decode: impl Fn(&StoredRecord) -> T) -> Self {
        Self {
            items: page.records.iter().map(decode).collect(),
            next_token: page.next_token,
        }
    }
}

/// Role-scoped query templates over the record store.
#[derive(Clone)]
pub struct AccessPatterns {
    store: Arc<dyn RecordStore>,
}

impl AccessPatterns {
    /// Wrap a record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for handler writes.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Indexed query with the one-shot scan fallback.
    ///
    /// A malformed continuation token is caller-fixable and is never
    /// retried; any other failure falls back to `scan_all` with a predicate
    /// equivalent to the index condition.
    async fn query_with_fallback(
        &self,
        index: SecondaryIndex,
        key: &str,
        filter: &RecordFilter<'_>,
        options: &QueryOptions,
    ) -> Result<Page> {
        match self
            .store
            .query_by_index(index, key, Some(filter), options)
            .await
        {
            Ok(page) => Ok(page),
            Err(StoreError::MalformedToken) => Err(StoreError::MalformedToken.into()),
            Err(err) => {
                warn!(
                    index = index.as_str(),
                    key,
                    error = %err,
                    "indexed query failed, falling back to scan"
                );
                let equivalent = |record: &StoredRecord| {
                    record.index_key(index).is_some_and(|k| k.partition == key) && filter(record)
                };
                self.store
                    .scan_all(Some(&equivalent), options)
                    .await
                    .map_err(CoreError::from)
            }
        }
    }

    /// Full scan, retried once on failure. This path *is* the fallback, so
    /// a second failure surfaces.
    async fn scan_with_retry(
        &self,
        filter: &RecordFilter<'_>,
        options: &QueryOptions,
    ) -> Result<Page> {
        match self.store.scan_all(Some(filter), options).await {
            Ok(page) => Ok(page),
            Err(StoreError::MalformedToken) => Err(StoreError::MalformedToken.into()),
            Err(err) => {
                warn!(error = %err, "scan failed, retrying once");
                self.store
                    .scan_all(Some(filter), options)
                    .await
                    .map_err(CoreError::from)
            }
        }
    }

    /// Point read, retried once on failure.
    async fn get_record(&self, pk: &str, sk: &str) -> Result<Option<StoredRecord>> {
        match self.store.get(pk, sk).await {
            Ok(found) => Ok(found),
            Err(err) => {
                warn!(pk, error = %err, "get failed, retrying once");
                self.store.get(pk, sk).await.map_err(CoreError::from)
            }
        }
    }

    // ========================================================================
    // Point lookups
    // ========================================================================

    /// Fetch a user profile.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let (pk, sk) = codec::user_key(user_id);
        Ok(self
            .get_record(&pk, &sk)
            .await?
            .as_ref()
            .map(codec::decode_user))
    }

    /// Fetch an application (without reviews; see
    /// [`reviews_for_application`](Self::reviews_for_application)).
    pub async fn get_application(&self, application_id: &str) -> Result<Option<Application>> {
        let (pk, sk) = codec::application_key(application_id);
        Ok(self
            .get_record(&pk, &sk)
            .await?
            .as_ref()
            .map(codec::decode_application))
    }

    /// Fetch a match.
    pub async fn get_match(&self, match_id: &str) -> Result<Option<Match>> {
        let (pk, sk) = codec::match_key(match_id);
        Ok(self
            .get_record(&pk, &sk)
            .await?
            .as_ref()
            .map(codec::decode_match))
    }

    /// Fetch a host's semester registration.
    pub async fn get_registration(
        &self,
        user_id: &str,
        semester: &str,
    ) -> Result<Option<SemesterRegistration>> {
        let (pk, sk) = codec::registration_key(user_id, semester);
        Ok(self
            .get_record(&pk, &sk)
            .await?
            .as_ref()
            .map(codec::decode_registration))
    }

    /// Fetch a setting.
    pub async fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let (pk, sk) = codec::setting_key(key);
        Ok(self
            .get_record(&pk, &sk)
            .await?
            .as_ref()
            .map(codec::decode_setting))
    }

    /// The effective current term: the admin-configured setting when
    /// present, otherwise derived from the date. Degrades gracefully - a
    /// store failure here falls through to the date-derived default.
    pub async fn current_semester(&self) -> String {
        match self.get_setting(CURRENT_SEMESTER_KEY).await {
            Ok(Some(setting)) if !setting.value.is_empty() => setting.value,
            Ok(_) => semester::current_for(Utc::now()),
            Err(err) => {
                warn!(error = %err, "current-semester setting unavailable, using date-derived term");
                semester::current_for(Utc::now())
            }
        }
    }

    // ========================================================================
    // Application views
    // ========================================================================

    /// A student's own applications (index A).
    pub async fn applications_for_student(&self, student_id: &str) -> Result<Vec<Application>> {
        let key = codec::student_index_key(student_id);
        let page = self
            .query_with_fallback(
                SecondaryIndex::A,
                &key,
                &application_metadata_filter,
                &QueryOptions::default(),
            )
            .await?;
        Ok(page.records.iter().map(codec::decode_application).collect())
    }

    /// A term's applications (index B), paginated.
    pub async fn applications_for_semester(
        &self,
        semester: &str,
        options: &QueryOptions,
    ) -> Result<Listing<Application>> {
        let key = codec::semester_index_key(semester);
        let page = self
            .query_with_fallback(
                SecondaryIndex::B,
                &key,
                &application_metadata_filter,
                options,
            )
            .await?;
        Ok(Listing::from_page(page, codec::decode_application))
    }

    /// Applications naming a host in their ranked preferences.
    ///
    /// Explicit non-indexed path: full scan with a contains predicate,
    /// O(table size).
    pub async fn applications_for_host(
        &self,
        host_id: &str,
        options: &QueryOptions,
    ) -> Result<Listing<Application>> {
        let filter = |record: &StoredRecord| {
            application_metadata_filter(record) && ranked_hosts_contain(record, host_id)
        };
        let page = self.scan_with_retry(&filter, options).await?;
        Ok(Listing::from_page(page, codec::decode_application))
    }

    /// Every application (prefix scan), paginated.
    pub async fn all_applications(&self, options: &QueryOptions) -> Result<Listing<Application>> {
        let page = self
            .scan_with_retry(&application_metadata_filter, options)
            .await?;
        Ok(Listing::from_page(page, codec::decode_application))
    }

    /// All reviews of one application, keyed by host id (index A).
    pub async fn reviews_for_application(
        &self,
        application_id: &str,
    ) -> Result<BTreeMap<String, Review>> {
        let key = format!("{}{application_id}", codec::APPLICATION_PREFIX);
        let filter =
            |record: &StoredRecord| record.sk.starts_with(codec::REVIEW_SK_PREFIX);
        let page = self
            .query_with_fallback(SecondaryIndex::A, &key, &filter, &QueryOptions::default())
            .await?;
        Ok(page
            .records
            .iter()
            .map(codec::decode_review)
            .map(|review| (review.host_id.clone(), review))
            .collect())
    }

    // ========================================================================
    // User views
    // ========================================================================

    /// Users holding a role (index B), paginated.
    pub async fn users_by_role(
        &self,
        role: Role,
        options: &QueryOptions,
    ) -> Result<Listing<User>> {
        let key = codec::role_index_key(role);
        let page = self
            .query_with_fallback(SecondaryIndex::B, &key, &profile_filter, options)
            .await?;
        Ok(Listing::from_page(page, codec::decode_user))
    }

    /// Users holding a role, for public unauthenticated reads: any failure
    /// degrades to an empty result set, never an error.
    pub async fn public_users_by_role(&self, role: Role) -> Vec<User> {
        match self.users_by_role(role, &QueryOptions::default()).await {
            Ok(listing) => listing.items,
            Err(err) => {
                warn!(role = role.as_str(), error = %err, "public role listing degraded to empty");
                Vec::new()
            }
        }
    }

    /// Hosts registered for a term (index B over registration records).
    pub async fn hosts_registered_for_semester(
        &self,
        semester: &str,
    ) -> Result<Vec<SemesterRegistration>> {
        let key = codec::role_index_key(Role::Host);
        let sk = format!("{}{semester}", codec::SEMESTER_PREFIX);
        let filter = |record: &StoredRecord| record.sk == sk;
        let page = self
            .query_with_fallback(SecondaryIndex::B, &key, &filter, &QueryOptions::default())
            .await?;
        Ok(page
            .records
            .iter()
            .map(codec::decode_registration)
            .collect())
    }

    // ========================================================================
    // Match views
    // ========================================================================

    /// A student's matches (index A).
    pub async fn matches_for_student(&self, student_id: &str) -> Result<Vec<Match>> {
        let key = codec::student_index_key(student_id);
        let page = self
            .query_with_fallback(
                SecondaryIndex::A,
                &key,
                &match_metadata_filter,
                &QueryOptions::default(),
            )
            .await?;
        Ok(page.records.iter().map(codec::decode_match).collect())
    }

    /// A host's matches (index B).
    pub async fn matches_for_host(&self, host_id: &str) -> Result<Vec<Match>> {
        let key = codec::host_index_key(host_id);
        let page = self
            .query_with_fallback(
                SecondaryIndex::B,
                &key,
                &match_metadata_filter,
                &QueryOptions::default(),
            )
            .await?;
        Ok(page.records.iter().map(codec::decode_match).collect())
    }

    /// Every match (prefix scan), paginated.
    pub async fn all_matches(&self, options: &QueryOptions) -> Result<Listing<Match>> {
        let page = self.scan_with_retry(&match_metadata_filter, options).await?;
        Ok(Listing::from_page(page, codec::decode_match))
    }
}

fn application_metadata_filter(record: &StoredRecord) -> bool {
    record.pk.starts_with(codec::APPLICATION_PREFIX) && record.sk == codec::METADATA_SK
}

fn match_metadata_filter(record: &StoredRecord) -> bool {
    record.pk.starts_with(codec::MATCH_PREFIX) && record.sk == codec::METADATA_SK
}

fn profile_filter(record: &StoredRecord) -> bool {
    record.sk == codec::PROFILE_SK
}

fn ranked_hosts_contain(record: &StoredRecord, host_id: &str) -> bool {
    record
        .attributes
        .get("rankedHostIds")
        .and_then(|v| v.as_array())
        .is_some_and(|hosts| hosts.iter().any(|h| h.as_str() == Some(host_id)))
}

// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared helpers for shadowday-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use shadowday_core::entities::Role;
use shadowday_core::identity::Caller;
use shadowday_core::requests::{
    RegisterUserRequest, SetUserStatusRequest, SubmitApplicationRequest,
};
use shadowday_core::state::HandlerState;
use shadowday_core::{application_handlers, directory_handlers};
use shadowday_store::{
    MemoryStore, Page, QueryOptions, RecordFilter, RecordStore, SecondaryIndex, StoreError,
    StoredRecord,
};

/// Handler state over a fresh in-memory store.
pub fn memory_state() -> HandlerState {
    HandlerState::new(Arc::new(MemoryStore::new()))
}

pub fn student(id: &str) -> Caller {
    Caller::new(id, Role::Student)
}

pub fn host(id: &str) -> Caller {
    Caller::new(id, Role::Host)
}

pub fn admin(id: &str) -> Caller {
    Caller::new(id, Role::Admin)
}

/// Register a profile with the given role.
pub async fn register_user(state: &HandlerState, user_id: &str, role: Role) {
    directory_handlers::handle_register_user(
        state,
        RegisterUserRequest {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.org"),
            role: role.as_str().to_string(),
            first_name: user_id.to_string(),
            last_name: "Tester".to_string(),
            organization: String::new(),
            job_title: String::new(),
        },
    )
    .await
    .expect("registration should succeed");
}

/// Admin-approve a user (hosts start pending).
pub async fn approve_user(state: &HandlerState, user_id: &str) {
    directory_handlers::handle_set_user_status(
        state,
        &admin("admin-1"),
        SetUserStatusRequest {
            user_id: user_id.to_string(),
            status: "approved".to_string(),
        },
    )
    .await
    .expect("approval should succeed");
}

/// Submit an application and return its id.
pub async fn submit(
    state: &HandlerState,
    student_id: &str,
    ranked_host_ids: &[&str],
    semester: &str,
) -> String {
    application_handlers::handle_submit_application(
        state,
        &student(student_id),
        SubmitApplicationRequest {
            ranked_host_ids: ranked_host_ids.iter().map(|s| s.to_string()).collect(),
            semester: semester.to_string(),
            answers: serde_json::json!({}),
            preferences: serde_json::json!({}),
        },
    )
    .await
    .expect("submission should succeed")
    .application_id
}

/// Store wrapper that injects failures, for exercising the fallback policy.
///
/// `fail_index_queries` breaks only `query_by_index` (scan fallback should
/// cover); `fail_everything` breaks all operations (public reads should
/// degrade to empty, authenticated paths should surface the error).
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_index_queries: AtomicBool,
    pub fail_everything: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_index_queries: AtomicBool::new(false),
            fail_everything: AtomicBool::new(false),
        }
    }

    pub fn break_index_queries(&self) {
        self.fail_index_queries.store(true, Ordering::SeqCst);
    }

    pub fn break_everything(&self) {
        self.fail_everything.store(true, Ordering::SeqCst);
    }

    fn check_all(&self, operation: &str) -> Result<(), StoreError> {
        if self.fail_everything.load(Ordering::SeqCst) {
            Err(StoreError::unavailable(operation, "injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<StoredRecord>, StoreError> {
        self.check_all("get")?;
        self.inner.get(pk, sk).await
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        self.check_all("put")?;
        self.inner.put(record).await
    }

    async fn put_if_absent(&self, record: StoredRecord) -> Result<bool, StoreError> {
        self.check_all("put_if_absent")?;
        self.inner.put_if_absent(record).await
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError> {
        self.check_all("delete")?;
        self.inner.delete(pk, sk).await
    }

    async fn query_by_index(
        &self,
        index: SecondaryIndex,
        key: &str,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError> {
        self.check_all("query_by_index")?;
        if self.fail_index_queries.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("query_by_index", "injected failure"));
        }
        self.inner.query_by_index(index, key, filter, options).await
    }

    async fn scan_all(
        &self,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError> {
        self.check_all("scan_all")?;
        self.inner.scan_all(filter, options).await
    }
}

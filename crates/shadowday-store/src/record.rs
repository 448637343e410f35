// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record shape, query types, and the `RecordStore` trait.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A secondary index key pair: a non-unique partition component plus a sort
/// component that determines ordering within the partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    /// Partition component (e.g. `ROLE#host`).
    pub partition: String,
    /// Sort component; index queries return ascending by this value.
    pub sort: String,
}

/// Which of the two secondary indexes a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryIndex {
    /// First secondary index.
    A,
    /// Second secondary index.
    B,
}

impl SecondaryIndex {
    /// Stable name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "index-a",
            Self::B => "index-b",
        }
    }
}

/// A stored record: primary composite key, up to two secondary index key
/// pairs, and a JSON attribute payload.
///
/// The store is schema-light by design: heterogeneous entities share one
/// table and are distinguished only by their key prefixes and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Primary partition key (e.g. `APPLICATION#<id>`).
    pub pk: String,
    /// Primary sort key (e.g. `METADATA`).
    pub sk: String,
    /// Optional first secondary index key pair.
    pub index_a: Option<IndexKey>,
    /// Optional second secondary index key pair.
    pub index_b: Option<IndexKey>,
    /// Entity attributes as a JSON object.
    pub attributes: serde_json::Value,
}

impl StoredRecord {
    /// Create a record with no secondary indexes.
    pub fn new(pk: impl Into<String>, sk: impl Into<String>, attributes: serde_json::Value) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
            index_a: None,
            index_b: None,
            attributes,
        }
    }

    /// Attach the first secondary index key pair.
    pub fn with_index_a(mut self, partition: impl Into<String>, sort: impl Into<String>) -> Self {
        self.index_a = Some(IndexKey {
            partition: partition.into(),
            sort: sort.into(),
        });
        self
    }

    /// Attach the second secondary index key pair.
    pub fn with_index_b(mut self, partition: impl Into<String>, sort: impl Into<String>) -> Self {
        self.index_b = Some(IndexKey {
            partition: partition.into(),
            sort: sort.into(),
        });
        self
    }

    /// The key pair stored under the given index, if any.
    pub fn index_key(&self, index: SecondaryIndex) -> Option<&IndexKey> {
        match index {
            SecondaryIndex::A => self.index_a.as_ref(),
            SecondaryIndex::B => self.index_b.as_ref(),
        }
    }
}

/// In-memory predicate applied to records after retrieval.
pub type RecordFilter<'a> = dyn Fn(&StoredRecord) -> bool + Send + Sync + 'a;

/// Options for `query_by_index` and `scan_all`.
///
/// The limit bounds how many records are *retrieved* before the in-memory
/// filter runs, mirroring the page-then-filter semantics of the reference
/// store. A page that hits the limit carries a continuation token.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Maximum records retrieved for this page. `None` retrieves everything.
    pub limit: Option<u32>,
    /// Opaque continuation token from a previous page, echoed back unmodified.
    pub start_token: Option<String>,
}

impl QueryOptions {
    /// Options with a page limit and no continuation token.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            start_token: None,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records in this page, ascending by the queried index's sort component
    /// (or by primary key for scans).
    pub records: Vec<StoredRecord>,
    /// Continuation token to resume the listing, if more records may exist.
    pub next_token: Option<String>,
}

/// Internal cursor serialized into the opaque continuation token.
///
/// Callers must treat the token as opaque; nothing beyond "ascending by the
/// queried index's sort component" is part of its contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Cursor {
    /// Primary partition key of the last record returned.
    pub(crate) p: String,
    /// Primary sort key of the last record returned.
    pub(crate) k: String,
    /// Index sort component of the last record, for index queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) x: Option<String>,
}

pub(crate) fn encode_token(cursor: &Cursor) -> String {
    let bytes = serde_json::to_vec(cursor).unwrap_or_default();
    STANDARD.encode(bytes)
}

pub(crate) fn decode_token(token: &str) -> Result<Cursor, StoreError> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|_| StoreError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| StoreError::MalformedToken)
}

/// The record store contract.
///
/// No transactions and no cross-key atomicity: concurrent `put`s to
/// different keys are independent, concurrent `put`s to the same key are
/// last-write-wins with no version check. `put_if_absent` is the only
/// conditional primitive and exists to close create-race windows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by its primary composite key.
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Upsert a record, fully replacing any existing one under the same key.
    async fn put(&self, record: StoredRecord) -> Result<(), StoreError>;

    /// Create a record only if no record exists under its primary key.
    ///
    /// Returns `true` when this call created the record, `false` when a
    /// record was already present (the existing record is left untouched).
    async fn put_if_absent(&self, record: StoredRecord) -> Result<bool, StoreError>;

    /// Delete a record by its primary composite key. Deleting a missing
    /// record is a no-op.
    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError>;

    /// Query one secondary index by its partition value.
    ///
    /// Records are returned ascending by the index's sort component. The
    /// optional filter is evaluated in memory after retrieval.
    async fn query_by_index(
        &self,
        index: SecondaryIndex,
        key: &str,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError>;

    /// Scan the whole table, ascending by primary key.
    ///
    /// Fallback path for query shapes no index covers; O(table size).
    async fn scan_all(
        &self,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError>;
}

// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shadowday Store - Generic Keyed Record Store
//!
//! A schema-light record store: every entity lives in one logical table,
//! addressed by a primary composite key (`pk` + `sk`) and optionally
//! reachable through two secondary indexes, each a `(partition, sort)` key
//! pair derived from entity state.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              shadowday-core                   │
//! │   (codec, access patterns, workflow)          │
//! └──────────────────────┬────────────────────────┘
//!                        │ RecordStore trait
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//! ┌──────────────────┐       ┌──────────────────┐
//! │   SqliteStore    │       │   MemoryStore    │
//! │ (sqlx, embedded  │       │ (BTreeMap, tests │
//! │   migrations)    │       │  + embedded use) │
//! └──────────────────┘       └──────────────────┘
//! ```
//!
//! # Contract
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | `get` | point read by primary composite key |
//! | `put` | upsert, full record replace, last-write-wins |
//! | `put_if_absent` | conditional create; the only conditional primitive |
//! | `delete` | idempotent point delete |
//! | `query_by_index` | ascending by the index's sort component |
//! | `scan_all` | ascending by primary key; O(table size) fallback |
//!
//! There are no transactions and no cross-key atomicity. Query filters are
//! in-memory predicates evaluated after retrieval, and the retrieval limit
//! applies *before* filtering (page-then-filter). Pagination uses opaque
//! base64 continuation tokens that callers echo back unmodified.
//!
//! Backend failures surface as [`StoreError::Unavailable`]; a token that
//! fails to decode is [`StoreError::MalformedToken`].

pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;

pub use self::error::StoreError;
pub use self::memory::MemoryStore;
pub use self::record::{
    IndexKey, Page, QueryOptions, RecordFilter, RecordStore, SecondaryIndex, StoredRecord,
};
pub use self::sqlite::SqliteStore;

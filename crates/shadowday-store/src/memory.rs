// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory record store backend.
//!
//! Reference backend for tests and embedded use. A `BTreeMap` keyed by the
//! primary composite key gives scans their ascending order for free; index
//! queries sort matches by the index's sort component on the way out.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{
    Cursor, Page, QueryOptions, RecordFilter, RecordStore, SecondaryIndex, StoredRecord,
    decode_token, encode_token,
};

/// In-memory `RecordStore` implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<(String, String), StoredRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held. Test helper.
    pub fn len(&self) -> usize {
        self.records.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let map = self
            .records
            .read()
            .map_err(|e| StoreError::unavailable("read", e))?;
        Ok(map.values().cloned().collect())
    }
}

/// Cut one page out of an ordered candidate list.
///
/// `sort_key_of` yields the ordering key the cursor is expressed in; the
/// filter runs after the limit, mirroring the page-then-filter contract.
fn paginate(
    mut candidates: Vec<(String, StoredRecord)>,
    cursor: Option<Cursor>,
    filter: Option<&RecordFilter<'_>>,
    options: &QueryOptions,
    index_cursor: bool,
) -> Page {
    candidates.sort_by(|a, b| {
        (a.0.as_str(), a.1.pk.as_str(), a.1.sk.as_str())
            .cmp(&(b.0.as_str(), b.1.pk.as_str(), b.1.sk.as_str()))
    });

    if let Some(cursor) = cursor {
        let mark = (cursor.x.unwrap_or_default(), cursor.p, cursor.k);
        candidates.retain(|(sort, record)| {
            (sort.as_str(), record.pk.as_str(), record.sk.as_str())
                > (mark.0.as_str(), mark.1.as_str(), mark.2.as_str())
        });
    }

    let mut next_token = None;
    if let Some(limit) = options.limit {
        let limit = limit as usize;
        if candidates.len() > limit {
            candidates.truncate(limit);
            if let Some((sort, record)) = candidates.last() {
                next_token = Some(encode_token(&Cursor {
                    p: record.pk.clone(),
                    k: record.sk.clone(),
                    x: index_cursor.then(|| sort.clone()),
                }));
            }
        }
    }

    let records = candidates
        .into_iter()
        .map(|(_, record)| record)
        .filter(|record| filter.is_none_or(|f| f(record)))
        .collect();

    Page {
        records,
        next_token,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<StoredRecord>, StoreError> {
        let map = self
            .records
            .read()
            .map_err(|e| StoreError::unavailable("get", e))?;
        Ok(map.get(&(pk.to_string(), sk.to_string())).cloned())
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        let mut map = self
            .records
            .write()
            .map_err(|e| StoreError::unavailable("put", e))?;
        map.insert((record.pk.clone(), record.sk.clone()), record);
        Ok(())
    }

    async fn put_if_absent(&self, record: StoredRecord) -> Result<bool, StoreError> {
        let mut map = self
            .records
            .write()
            .map_err(|e| StoreError::unavailable("put_if_absent", e))?;
        let key = (record.pk.clone(), record.sk.clone());
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, record);
        Ok(true)
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError> {
        let mut map = self
            .records
            .write()
            .map_err(|e| StoreError::unavailable("delete", e))?;
        map.remove(&(pk.to_string(), sk.to_string()));
        Ok(())
    }

    async fn query_by_index(
        &self,
        index: SecondaryIndex,
        key: &str,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError> {
        let cursor = options
            .start_token
            .as_deref()
            .map(decode_token)
            .transpose()?;

        let candidates = self
            .read_all()?
            .into_iter()
            .filter_map(|record| {
                let sort = record.index_key(index).filter(|k| k.partition == key)?;
                Some((sort.sort.clone(), record.clone()))
            })
            .collect();

        Ok(paginate(candidates, cursor, filter, options, true))
    }

    async fn scan_all(
        &self,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError> {
        let cursor = options
            .start_token
            .as_deref()
            .map(decode_token)
            .transpose()?;

        // Scans order by primary key; reuse the pagination helper with an
        // empty sort component so the cursor compares on (pk, sk) alone.
        let candidates = self
            .read_all()?
            .into_iter()
            .map(|record| (String::new(), record))
            .collect();

        Ok(paginate(candidates, cursor, filter, options, false))
    }
}

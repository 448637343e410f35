// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared state for request handlers.

use std::sync::Arc;

use shadowday_store::RecordStore;

use crate::access::AccessPatterns;

/// Shared state for all handlers.
///
/// Holds the access-pattern layer (and through it the record store) shared
/// across concurrent handler calls. Handlers are request-scoped: there is no
/// in-process coordination between callers and no locks here.
pub struct HandlerState {
    /// Role-scoped query templates over the record store.
    pub access: AccessPatterns,
    /// Default page size for listings when a request carries no limit.
    pub default_page_limit: u32,
}

impl HandlerState {
    /// Create handler state over the given store with the default page size.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            access: AccessPatterns::new(store),
            default_page_limit: 50,
        }
    }

    /// Override the default page size (from configuration).
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.default_page_limit = limit;
        self
    }

    /// The underlying record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.access.store()
    }
}

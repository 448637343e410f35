// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for shadowday-store.

use thiserror::Error;

/// Errors surfaced by record store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed; reads and writes must never silently swallow
    /// this (the access layer's explicit fallback policy is the one
    /// exception, and it lives above this crate).
    #[error("store unavailable during '{operation}': {details}")]
    Unavailable {
        /// The store operation that failed.
        operation: String,
        /// Backend error details.
        details: String,
    },

    /// A continuation token could not be decoded. Caller-fixable: tokens
    /// must be echoed back unmodified.
    #[error("malformed continuation token")]
    MalformedToken,
}

impl StoreError {
    /// Wrap a backend error for the given operation.
    pub fn unavailable(operation: &str, details: impl ToString) -> Self {
        Self::Unavailable {
            operation: operation.to_string(),
            details: details.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        let err = StoreError::unavailable("put", "disk full");
        assert_eq!(err.to_string(), "store unavailable during 'put': disk full");
    }

    #[test]
    fn test_malformed_token_display() {
        assert_eq!(
            StoreError::MalformedToken.to_string(),
            "malformed continuation token"
        );
    }
}

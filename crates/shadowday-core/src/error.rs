// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for shadowday-core.
//!
//! Provides a unified error taxonomy that the routing collaborator maps to
//! wire responses via [`CoreError::error_code`].

use std::fmt;

use shadowday_store::StoreError;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur during request processing.
///
/// Validation, authorization, not-found, conflict, and invalid-state errors
/// are detected and returned at the point of detection, never retried.
/// `StoreUnavailable` is only surfaced after the access layer's one
/// scan-fallback retry is exhausted.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// Malformed input; caller-fixable.
    Validation {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// The request token was absent or could not be resolved to a caller.
    Unauthenticated {
        /// Why the token was rejected.
        reason: String,
    },

    /// The caller lacks the role or ownership the operation requires.
    Authorization {
        /// What the caller was not allowed to do.
        message: String,
    },

    /// A referenced entity is absent.
    NotFound {
        /// The entity kind (e.g. "application").
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// Duplicate submission or a competing write won.
    Conflict {
        /// Conflict description.
        message: String,
    },

    /// The entity is in a state that disallows the requested transition.
    InvalidState {
        /// The entity identifier.
        entity_id: String,
        /// The entity's current status.
        status: String,
    },

    /// The record store failed after fallback was exhausted.
    StoreUnavailable {
        /// The store operation that failed.
        operation: String,
        /// Backend error details.
        details: String,
    },
}

impl CoreError {
    /// Build a validation error.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Build an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Build a not-found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Build a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Build an invalid-state error.
    pub fn invalid_state(entity_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::InvalidState {
            entity_id: entity_id.into(),
            status: status.into(),
        }
    }

    /// Get the error code string for this error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Unauthenticated { .. } => "UNAUTHENTICATED",
            Self::Authorization { .. } => "AUTHORIZATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::Unauthenticated { reason } => {
                write!(f, "Unauthenticated: {}", reason)
            }
            Self::Authorization { message } => {
                write!(f, "Not authorized: {}", message)
            }
            Self::NotFound { entity, id } => {
                write!(f, "{} '{}' not found", entity, id)
            }
            Self::Conflict { message } => {
                write!(f, "Conflict: {}", message)
            }
            Self::InvalidState { entity_id, status } => {
                write!(
                    f,
                    "'{}' is in state '{}' which does not allow this operation",
                    entity_id, status
                )
            }
            Self::StoreUnavailable { operation, details } => {
                write!(f, "Store unavailable during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { operation, details } => {
                CoreError::StoreUnavailable { operation, details }
            }
            StoreError::MalformedToken => {
                CoreError::validation("nextToken", "malformed continuation token")
            }
        }
    }
}

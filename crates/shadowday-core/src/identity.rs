// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Identity seam: the resolved caller and the collaborator that resolves it.
//!
//! The core never parses or verifies credentials; it consumes a resolved
//! `(userId, role)` identity from the Identity collaborator. The token-table
//! implementation here serves the CLI binary and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::entities::Role;
use crate::error::CoreError;

/// A resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// The caller's user id.
    pub user_id: String,
    /// The caller's role.
    pub role: Role,
}

impl Caller {
    /// Construct a caller.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Whether the caller is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the caller holds one of the given roles.
    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// Resolves a request token to a caller, failing `Unauthenticated` on
/// invalid or absent tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a request token.
    async fn resolve_caller(&self, token: &str) -> Result<Caller, CoreError>;
}

/// Token-table identity provider for embedded use and tests.
#[derive(Debug, Default)]
pub struct StaticTokenIdentity {
    tokens: RwLock<HashMap<String, Caller>>,
}

impl StaticTokenIdentity {
    /// Create an empty token table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a caller.
    pub fn insert_token(&self, token: impl Into<String>, caller: Caller) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(token.into(), caller);
        }
    }

    /// Parse a `token=user:role;token=user:role` table, as supplied via the
    /// `SHADOWDAY_TOKENS` environment variable. Malformed entries are
    /// skipped.
    pub fn from_table(table: &str) -> Self {
        let identity = Self::new();
        for entry in table.split(';').filter(|e| !e.trim().is_empty()) {
            let Some((token, subject)) = entry.split_once('=') else {
                continue;
            };
            let Some((user_id, role)) = subject.split_once(':') else {
                continue;
            };
            let Some(role) = Role::parse(role.trim()) else {
                continue;
            };
            identity.insert_token(token.trim(), Caller::new(user_id.trim(), role));
        }
        identity
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn resolve_caller(&self, token: &str) -> Result<Caller, CoreError> {
        if token.is_empty() {
            return Err(CoreError::Unauthenticated {
                reason: "missing token".to_string(),
            });
        }
        let tokens = self.tokens.read().map_err(|_| CoreError::Unauthenticated {
            reason: "identity table unavailable".to_string(),
        })?;
        tokens
            .get(token)
            .cloned()
            .ok_or_else(|| CoreError::Unauthenticated {
                reason: "unknown token".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_known_token() {
        let identity = StaticTokenIdentity::new();
        identity.insert_token("tok-1", Caller::new("alice", Role::Student));

        let caller = identity.resolve_caller("tok-1").await.unwrap();
        assert_eq!(caller.user_id, "alice");
        assert_eq!(caller.role, Role::Student);
    }

    #[tokio::test]
    async fn test_unknown_and_empty_tokens_fail() {
        let identity = StaticTokenIdentity::new();
        let err = identity.resolve_caller("nope").await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");

        let err = identity.resolve_caller("").await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_from_table_parses_entries() {
        let identity =
            StaticTokenIdentity::from_table("t1=alice:student; t2=bob:host;broken;t3=eve:wizard");

        assert!(identity.resolve_caller("t1").await.is_ok());
        let bob = identity.resolve_caller("t2").await.unwrap();
        assert_eq!(bob.role, Role::Host);
        // Unknown role and malformed entries are skipped.
        assert!(identity.resolve_caller("t3").await.is_err());
        assert!(identity.resolve_caller("broken").await.is_err());
    }
}

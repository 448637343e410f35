// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shadowday Core - line-oriented request runner.
//!
//! Stands in for the Request Routing collaborator: reads one JSON envelope
//! per stdin line (`{"token": "...", "request": {"op": "...", ...}}`),
//! resolves the caller through the identity seam, dispatches the typed
//! request, and prints one JSON result per line. Transport concerns stay
//! out here; the core only ever sees typed requests.

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use shadowday_core::config::Config;
use shadowday_core::identity::{IdentityProvider, StaticTokenIdentity};
use shadowday_core::requests::{ApiRequest, dispatch};
use shadowday_core::state::HandlerState;
use shadowday_store::{MemoryStore, RecordStore, SqliteStore};

/// One request envelope per input line.
#[derive(Debug, Deserialize)]
struct Envelope {
    /// Request token; absent for anonymous operations.
    #[serde(default)]
    token: Option<String>,
    /// The typed operation.
    request: ApiRequest,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shadowday_core=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Shadowday Core");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    let store: Arc<dyn RecordStore> = if config.database_url == "memory" {
        info!("Using in-memory record store");
        Arc::new(MemoryStore::new())
    } else {
        info!(url = %config.database_url, "Connecting to SQLite record store");
        Arc::new(SqliteStore::connect(&config.database_url).await?)
    };

    let state = HandlerState::new(store).with_page_limit(config.default_page_limit);

    let identity = match std::env::var("SHADOWDAY_TOKENS") {
        Ok(table) => StaticTokenIdentity::from_table(&table),
        Err(_) => StaticTokenIdentity::new(),
    };

    info!("Shadowday Core initialized, reading requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let output = handle_line(&state, &identity, &line).await;
        println!("{output}");
    }

    info!("Input closed, shutting down");
    Ok(())
}

/// Process one envelope line into a JSON result line.
async fn handle_line(
    state: &HandlerState,
    identity: &StaticTokenIdentity,
    line: &str,
) -> serde_json::Value {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(err) => {
            return serde_json::json!({
                "error": { "code": "VALIDATION_ERROR", "message": format!("malformed request: {err}") }
            });
        }
    };

    let caller = match envelope.token.as_deref() {
        Some(token) => match identity.resolve_caller(token).await {
            Ok(caller) => Some(caller),
            Err(err) => {
                return serde_json::json!({
                    "error": { "code": err.error_code(), "message": err.to_string() }
                });
            }
        },
        None => None,
    };

    match dispatch(state, caller.as_ref(), envelope.request).await {
        Ok(payload) => serde_json::json!({ "ok": payload }),
        Err(err) => serde_json::json!({
            "error": { "code": err.error_code(), "message": err.to_string() }
        }),
    }
}

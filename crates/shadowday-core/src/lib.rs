// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shadowday Core - Application & Matching Engine
//!
//! This crate is the core of a work-shadowing program: students submit a
//! ranked list of up to five host preferences per term, hosts review
//! applications that name them, and an administrator converts an
//! application into a confirmed placement ("match").
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Request Routing collaborator                            │
//! │        (thin CLI/HTTP layer; resolves transport, not semantics)          │
//! └──────────────────────────────────┬──────────────────────────────────────┘
//!                                    │ typed ApiRequest + resolved Caller
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Workflow handlers                                 │
//! │   application_handlers        matching          directory_handlers      │
//! └──────────────────────────────────┬──────────────────────────────────────┘
//!                                    │ role-scoped query templates
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Access-Pattern Layer                                │
//! │      (indexed queries, one-shot scan fallback, public degrades)          │
//! └──────────────────────────────────┬──────────────────────────────────────┘
//!                                    │ Entity Codec (encode/decode)
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   shadowday-store (RecordStore)                          │
//! │              SQLite (sqlx) or in-memory backend                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Application State Machine
//!
//! ```text
//!                  ┌───────────┐
//!                  │ SUBMITTED │◄─── Submit (claims (student, term))
//!                  └─────┬─────┘
//!            review*     │ withdraw         ┌───────────┐
//!        (derived, not   ├─────────────────►│ WITHDRAWN │ (claim released)
//!         a status)      │                  └───────────┘
//!                        │ CreateMatch (admin, ranked host only)
//!                        ▼
//!                  ┌───────────┐            ┌───────────┐
//!                  │  MATCHED  │───────────►│ COMPLETED │
//!                  └───────────┘            └───────────┘
//! ```
//!
//! "Reviewed" is a derived condition (one or more review records present);
//! the stored status stays `submitted` until the match transition.
//!
//! # Concurrency
//!
//! Handlers are request-scoped with no locks. The three documented races
//! and their dispositions:
//!
//! | Race | Disposition |
//! |------|-------------|
//! | duplicate submission | closed by a conditional claim put on `(student, term)` |
//! | lost review merge | avoided structurally: one record per `(application, host)` |
//! | non-atomic match creation | accepted; `CreateMatch` is idempotent and re-driveable |
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `SHADOWDAY_DATABASE_URL` | Yes | - | SQLite URL, or `memory` |
//! | `SHADOWDAY_PAGE_LIMIT` | No | `50` | Default listing page size |
//! | `SHADOWDAY_TOKENS` | No | - | `token=user:role;...` table for the CLI |
//!
//! # Modules
//!
//! - [`access`]: role-scoped query templates with scan fallback
//! - [`application_handlers`]: submit/review/update/get/withdraw/list
//! - [`codec`]: entity ↔ record mapping with decode-with-defaults
//! - [`config`]: environment configuration
//! - [`directory_handlers`]: profiles, approval pipeline, public reads
//! - [`entities`]: domain types
//! - [`error`]: error taxonomy with wire code mapping
//! - [`identity`]: resolved caller and the identity seam
//! - [`matching`]: the match transition
//! - [`requests`]: typed request surface and dispatch
//! - [`semester`]: term label normalization
//! - [`state`]: shared handler state

pub mod access;
pub mod application_handlers;
pub mod codec;
pub mod config;
pub mod directory_handlers;
pub mod entities;
pub mod error;
pub mod identity;
pub mod matching;
pub mod requests;
pub mod semester;
pub mod state;

pub use self::error::{CoreError, Result};
pub use self::identity::{Caller, IdentityProvider};
pub use self::state::HandlerState;

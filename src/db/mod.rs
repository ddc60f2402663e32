//! Database access.
//!
//! - [`turso`]: the libsql client (local file, in-memory or remote Turso),
//!   users and password reset tokens
//! - [`tables`]: the registry of admission tables
//! - [`queries`]: statements that run inside upload transactions
//! - [`dashboard`]: read-only dashboard queries

#![allow(missing_docs)]

pub mod dashboard;
pub mod queries;
pub mod tables;
pub mod turso;

pub use queries::LatestIteration;
pub use tables::{TableKind, TableSchema};
pub use turso::{AdmissionsDb, NewUser, ResetRedemption, User};

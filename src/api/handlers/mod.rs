//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Staff authentication handlers (register, login, password reset).
pub mod auth;
/// Table reads and dashboard queries.
pub mod dashboard;
/// CSV table uploads.
pub mod upload;
/// Single and bulk withdrawals.
pub mod withdraw;

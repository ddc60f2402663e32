//! # Admissions Server
//!
//! Back office for an admissions team: staff accounts, CSV uploads of
//! applicant, offer and fee tables, and automatic reconciliation of each
//! applicant's offer status (`accept`, `accept & upgraded`, `upgrade`,
//! `withdraw`) from the fees they have paid.
//!
//! ## Overview
//!
//! The crate can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `admissions-server` binary
//! 2. **As a library** - Mount [`build_router`] in your own axum application
//!
//! ### Library Example
//!
//! ```rust,ignore
//! use admissions::{build_router, AdmissionsConfigManager, AppState};
//!
//! let config_manager = AdmissionsConfigManager::new("admissions.toml")?;
//! let state = AppState::from_config(config_manager).await?;
//! let app = build_router(state);
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - Password hashing, JWT sessions and middleware
//! - [`db`] - libsql storage (local SQLite file, in-memory, or Turso)
//! - [`upload`] - CSV parsing and transactional uploads
//! - [`reconcile`] - Offer status rules
//! - [`mail`] - Password reset mail delivery
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// JWT authentication and middleware.
pub mod auth;
/// Command-line interface (init, config, user provisioning).
pub mod cli;
/// Database client and queries.
pub mod db;
/// Outgoing mail.
pub mod mail;
/// Offer status reconciliation.
pub mod reconcile;
/// Core types (requests, responses, errors).
pub mod types;
/// CSV uploads and withdrawals.
pub mod upload;
/// Configuration utilities (TOML).
pub mod utils;

use std::sync::Arc;

// Re-export commonly used types
pub use api::routes::build_router;
pub use auth::jwt::AuthService;
pub use db::AdmissionsDb;
pub use mail::{LogMailer, Mailer};
pub use types::{AppError, Result};
pub use utils::toml_config::{AdmissionsConfig, AdmissionsConfigManager, ConfigError};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config_manager: Arc<AdmissionsConfigManager>,
    pub db: Arc<AdmissionsDb>,
    pub auth_service: Arc<AuthService>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Opens the configured database and mailer.
    ///
    /// A Turso database is used when both `turso_url_env` and
    /// `turso_token_env` resolve; otherwise `database.url` is opened locally.
    pub async fn from_config(config_manager: AdmissionsConfigManager) -> anyhow::Result<Self> {
        let config = config_manager.config();

        let db = AdmissionsDb::from_config(&config).await?;

        let auth_service = AuthService::new(
            config.jwt_secret()?,
            config.auth.access_token_expiry,
            config.auth.reset_token_expiry,
        );
        let mailer = mail::build_mailer(&config)?;

        Ok(Self {
            config_manager: Arc::new(config_manager),
            db: Arc::new(db),
            auth_service: Arc::new(auth_service),
            mailer,
        })
    }
}

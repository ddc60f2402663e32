//! HTTP API Handlers and Routes
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Authentication (`/api`)
//! - `POST /api/register` - Create a staff account, sets the session cookie
//! - `POST /api/login` - Login, sets the session cookie
//! - `POST /api/logout` - Clear the session cookie
//! - `GET /api/validate-token` - Check the session
//! - `GET /api/user` - Name and role of the caller
//! - `POST /api/forgot-password` - Email a reset link
//! - `POST /api/reset-password` - Set a new password (form data)
//!
//! ## Tables
//! - `POST /update/{table}` - Upsert a CSV (admin)
//! - `GET /data/{table}` - Read every row of a table
//!
//! ## Withdrawals (`/api/withdraw`)
//! - `POST /api/withdraw/student` - Withdraw one applicant
//! - `POST /api/withdraw/upload` - Withdraw applicants listed in a CSV
//!
//! ## Dashboard (`/api`)
//! - `GET /api/stats`, `/api/students`, `/api/fees`, `/api/iterations`,
//!   `/api/iteration-count`, `/api/logs`
//!
//! ## Health
//! - `GET /health`
//!
//! # Authentication
//!
//! Protected endpoints read the session token from the `token` cookie, or
//! from an `Authorization: Bearer <token>` header.
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

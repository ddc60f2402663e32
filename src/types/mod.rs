use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

// ============= Staff Roles =============

/// Access level of a staff account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access: uploads, withdrawals, logs.
    Admin,
    /// Read-only dashboards.
    #[default]
    View,
    /// Read-only dashboards plus withdrawing applicants.
    ViewAndWithdraw,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::View, Role::ViewAndWithdraw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::View => "view",
            Role::ViewAndWithdraw => "view_and_withdraw",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                AppError::InvalidInput(
                    "Invalid role. Allowed roles: admin, view, view_and_withdraw.".to_string(),
                )
            })
    }
}

// ============= Authentication Types =============

/// Purpose of a signed token. Session cookies only ever carry `Access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Email address of the staff member.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub campus: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub message: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordForm {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============= Upload Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    /// Rows written by the upsert.
    pub rows: usize,
    /// Offer statuses rewritten by reconciliation.
    pub reconciled: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    pub app_no: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkWithdrawResponse {
    pub message: String,
    pub withdrawn: usize,
    pub missing: Vec<String>,
}

/// Row appended to `LOGS` for every change made through the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    pub file_name: String,
    pub category: String,
    pub upload_date: String,
    pub uploaded_by: String,
    pub remark: String,
    pub ip_address: Option<String>,
}

// ============= Dashboard Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_applications: i64,
    pub accepted_students: i64,
    pub latest_iteration_number: Option<i64>,
    pub latest_iteration_date: Option<String>,
    pub gender_stats: std::collections::BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentOffer {
    pub app_no: String,
    pub name: Option<String>,
    pub itr_no: Option<i64>,
    pub offer: Option<String>,
    pub scholarship: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeeRecord {
    pub app_no: String,
    pub admission_fees_amount: Option<f64>,
    pub admission_fees_status: bool,
    pub admission_fees_paid_date: Option<String>,
    pub admission_fees_uploaded_by: Option<String>,
    pub admission_fees_upload_date_time: Option<String>,
    pub tution_fees_amount: Option<f64>,
    pub tution_fees_status: bool,
    pub tution_fees_paid_date: Option<String>,
    pub tution_fees_uploaded_by: Option<String>,
    pub tution_fees_upload_date_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct IterationQuery {
    pub iteration: i64,
}

/// A result list, or a human readable note when nothing matched.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListOrMessage<T> {
    List(Vec<T>),
    Message(MessageResponse),
}

impl<T> ListOrMessage<T> {
    pub fn from_rows(rows: Vec<T>, empty: &str) -> Self {
        if rows.is_empty() {
            ListOrMessage::Message(MessageResponse::new(empty))
        } else {
            ListOrMessage::List(rows)
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<libsql::Error> for AppError {
    fn from(e: libsql::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, message) = match self {
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Mail(msg) => {
                tracing::error!(error = %msg, "mail delivery failure");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "detail": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_register_request_reads_camel_case_confirm() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.c","password":"x","confirmPassword":"x"}"#,
        )
        .unwrap();
        assert_eq!(req.confirm_password.as_deref(), Some("x"));
        assert!(req.role.is_none());
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = StatsResponse {
            total_applications: 3,
            accepted_students: 1,
            latest_iteration_number: Some(2),
            latest_iteration_date: None,
            gender_stats: Default::default(),
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["totalApplications"], 3);
        assert_eq!(value["latestIterationNumber"], 2);
        assert!(value.get("genderStats").is_some());
    }

    #[test]
    fn test_list_or_message() {
        let empty: ListOrMessage<i32> = ListOrMessage::from_rows(vec![], "nothing");
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            serde_json::json!({"message": "nothing"})
        );
        let full = ListOrMessage::from_rows(vec![1, 2], "nothing");
        assert_eq!(serde_json::to_value(&full).unwrap(), serde_json::json!([1, 2]));
    }

    #[test]
    fn test_error_status_codes() {
        use axum::http::StatusCode;
        let cases = [
            (AppError::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Mail("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}

use crate::{
    auth::{
        cookie::{clear_session_cookie, session_cookie},
        jwt::TokenError,
        middleware::AuthUser,
    },
    db::{NewUser, ResetRedemption},
    mail::{reset_email_body, RESET_SUBJECT},
    types::{
        AppError, AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
        RegisterRequest, ResetPasswordForm, Result, Role, TokenKind, UserInfo, ValidateResponse,
    },
    AppState,
};
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    Form, Json,
};
use tracing::{info, warn};

/// Non-empty value of an optional request field.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

fn cookie_headers(state: &AppState, token: &str) -> Result<HeaderMap> {
    let secure = state.config_manager.config().auth.secure_cookies;
    let cookie = session_cookie(token, state.auth_service.access_expiry(), secure)
        .ok_or_else(|| AppError::Internal("Token is not a valid cookie value".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok(headers)
}

/// Register a new staff account
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or user already exists")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>)> {
    let (Some(name), Some(email), Some(contact), Some(campus), Some(password), Some(confirm)) = (
        present(&payload.name),
        present(&payload.email),
        present(&payload.contact),
        present(&payload.campus),
        present(&payload.password),
        present(&payload.confirm_password),
    ) else {
        return Err(AppError::InvalidInput("All fields are required.".to_string()));
    };

    if password != confirm {
        return Err(AppError::InvalidInput("Passwords do not match.".to_string()));
    }

    if !state.config_manager.config().auth.is_allowed_campus(campus) {
        return Err(AppError::InvalidInput("Invalid campus selection.".to_string()));
    }

    let role: Role = match payload.role.as_deref() {
        Some(role) => role.parse()?,
        None => Role::default(),
    };

    if state.db.get_user_by_email(email).await?.is_some() {
        return Err(AppError::InvalidInput("User already exists.".to_string()));
    }

    let hashed_password = state.auth_service.hash_password(password)?;
    state
        .db
        .create_user(&NewUser {
            name,
            email,
            contact,
            campus,
            hashed_password: &hashed_password,
            role,
        })
        .await?;

    let token = state.auth_service.issue_access_token(email, role)?;
    info!(email, %role, campus, "Registered user");

    Ok((
        cookie_headers(&state, &token)?,
        Json(AuthResponse {
            token,
            message: "User registered successfully.".to_string(),
        }),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields or invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>)> {
    let (Some(email), Some(password)) = (present(&payload.email), present(&payload.password))
    else {
        return Err(AppError::InvalidInput(
            "Email and password required.".to_string(),
        ));
    };

    let invalid = || AppError::InvalidInput("Invalid email or password.".to_string());

    let user = match state.db.get_user_by_email(email).await? {
        Some(user) => user,
        None => {
            info!(email, "Login for unknown email");
            return Err(invalid());
        }
    };

    if !state
        .auth_service
        .verify_password(password, &user.hashed_password)?
    {
        info!(email, "Password verification failed");
        return Err(invalid());
    }

    let token = state.auth_service.issue_access_token(&user.email, user.role)?;
    info!(email, role = %user.role, "Login successful");

    Ok((
        cookie_headers(&state, &token)?,
        Json(AuthResponse {
            token,
            message: "Login successful.".to_string(),
        }),
    ))
}

/// Check that the session cookie is still valid
#[utoipa::path(
    get,
    path = "/api/validate-token",
    responses(
        (status = 200, description = "Token is valid", body = ValidateResponse),
        (status = 401, description = "Missing, expired or invalid token")
    ),
    tag = "auth"
)]
pub async fn validate_token(_user: AuthUser) -> Json<ValidateResponse> {
    Json(ValidateResponse { valid: true })
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse)),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>) -> (HeaderMap, Json<MessageResponse>) {
    let secure = state.config_manager.config().auth.secure_cookies;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie(secure));

    (headers, Json(MessageResponse::new("Logged out")))
}

/// Name and role of the signed-in user
#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 404, description = "User no longer exists")
    ),
    tag = "auth"
)]
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserInfo>> {
    let record = state
        .db
        .get_user_by_email(user.email())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(Json(UserInfo {
        name: record.name,
        role: record.role,
    }))
}

/// Email a password reset link
#[utoipa::path(
    post,
    path = "/api/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent", body = MessageResponse),
        (status = 400, description = "Email missing"),
        (status = 404, description = "Unknown user"),
        (status = 500, description = "Mail delivery failed")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let email = present(&payload.email)
        .ok_or_else(|| AppError::InvalidInput("Email is required.".to_string()))?;

    let user = state
        .db
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    let token = state.auth_service.issue_reset_token(&user.email)?;
    let expires_at = chrono::Utc::now().timestamp() + state.auth_service.reset_expiry();
    state
        .db
        .store_reset_token(&state.auth_service.hash_token(&token), &user.email, expires_at)
        .await?;

    let config = state.config_manager.config();
    let reset_link = format!("{}?token={}", config.mail.reset_url, token);
    let body = reset_email_body(&reset_link, state.auth_service.reset_expiry() / 60);
    state
        .mailer
        .send_html(&user.email, RESET_SUBJECT, &body)
        .await?;

    info!(email = %user.email, "Password reset email sent");
    Ok(Json(MessageResponse::new(
        "Password reset email sent successfully.",
    )))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/api/reset-password",
    request_body(content = ResetPasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid, expired or reused token"),
        (status = 404, description = "Unknown user")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Json<MessageResponse>> {
    let claims = state
        .auth_service
        .decode_token(&form.token)
        .map_err(|e| match e {
            TokenError::Expired => AppError::InvalidInput("Reset token expired.".to_string()),
            TokenError::Invalid => AppError::InvalidInput("Invalid reset token.".to_string()),
        })?;

    if claims.kind != TokenKind::Reset {
        return Err(AppError::InvalidInput("Invalid token type.".to_string()));
    }

    if form.new_password.is_empty() {
        return Err(AppError::InvalidInput("New password is required.".to_string()));
    }

    if state.db.get_user_by_email(&claims.sub).await?.is_none() {
        return Err(AppError::NotFound("User not found.".to_string()));
    }

    let hashed_password = state.auth_service.hash_password(&form.new_password)?;
    let token_hash = state.auth_service.hash_token(&form.token);
    match state
        .db
        .redeem_reset_token(&token_hash, &claims.sub, &hashed_password)
        .await?
    {
        ResetRedemption::PasswordChanged => {}
        ResetRedemption::TokenRejected => {
            warn!(email = %claims.sub, "Rejected unknown or reused reset token");
            return Err(AppError::InvalidInput(
                "Reset token has already been used.".to_string(),
            ));
        }
        ResetRedemption::UnknownUser => {
            return Err(AppError::NotFound("User not found.".to_string()));
        }
    }

    info!(email = %claims.sub, "Password reset");
    Ok(Json(MessageResponse::new(
        "Password has been reset successfully.",
    )))
}

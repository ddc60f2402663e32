use crate::api::handlers::{auth, dashboard, upload, withdraw};
use crate::auth::jwt::AuthService;
use crate::types::{
    AuthResponse, BulkWithdrawResponse, CountResponse, FeeRecord, ForgotPasswordRequest,
    LogEntry, LoginRequest, MessageResponse, RegisterRequest, ResetPasswordForm, Role,
    StatsResponse, StudentOffer, UploadResponse, UserInfo, ValidateResponse, WithdrawRequest,
};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        auth::validate_token,
        auth::current_user,
        auth::forgot_password,
        auth::reset_password,
        upload::upload_table,
        withdraw::withdraw_student,
        withdraw::withdraw_upload,
        dashboard::read_table,
        dashboard::stats,
        dashboard::students,
        dashboard::fees,
        dashboard::iteration_count,
        dashboard::iterations,
        dashboard::logs,
        dashboard::health,
    ),
    components(schemas(
        Role,
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        ForgotPasswordRequest,
        ResetPasswordForm,
        UserInfo,
        ValidateResponse,
        MessageResponse,
        UploadResponse,
        WithdrawRequest,
        BulkWithdrawResponse,
        LogEntry,
        StatsResponse,
        StudentOffer,
        FeeRecord,
        CountResponse,
    )),
    tags(
        (name = "auth", description = "Staff accounts and sessions"),
        (name = "upload", description = "CSV table uploads"),
        (name = "withdraw", description = "Applicant withdrawals"),
        (name = "data", description = "Tables and dashboard queries"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

pub fn create_router(auth_service: Arc<AuthService>) -> Router<AppState> {
    let public_routes = Router::new()
        // Public routes (no auth required)
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/forgot-password", post(auth::forgot_password))
        .route("/api/reset-password", post(auth::reset_password))
        .route("/health", get(dashboard::health));

    let protected_routes = Router::new()
        // Protected routes (auth required)
        .route("/api/validate-token", get(auth::validate_token))
        .route("/api/user", get(auth::current_user))
        // Tables
        .route("/update/{table}", post(upload::upload_table))
        .route("/data/{table}", get(dashboard::read_table))
        // Withdrawals
        .route("/api/withdraw/student", post(withdraw::withdraw_student))
        .route("/api/withdraw/upload", post(withdraw::withdraw_upload))
        // Dashboard
        .route("/api/stats", get(dashboard::stats))
        .route("/api/students", get(dashboard::students))
        .route("/api/fees", get(dashboard::fees))
        .route("/api/iteration-count", get(dashboard::iteration_count))
        .route("/api/iterations", get(dashboard::iterations))
        .route("/api/logs", get(dashboard::logs))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            crate::auth::middleware::auth_middleware(auth_service.clone(), req, next)
        }));

    public_routes.merge(protected_routes)
}

/// The complete application: routes, docs and the HTTP middleware stack.
pub fn build_router(state: AppState) -> Router {
    let config = state.config_manager.config();
    let max_body = config.upload.max_file_bytes;

    let router = create_router(state.auth_service.clone());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    );

    router
        .layer(DefaultBodyLimit::max(max_body))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors_layer(&config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Cookies need explicit origins; wildcards are rejected with credentials
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

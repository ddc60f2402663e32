use crate::{
    auth::middleware::AuthUser,
    db::{TableKind, TableSchema},
    types::{
        AppError, CountResponse, FeeRecord, IterationQuery, ListOrMessage, LogEntry, Result, Role,
        SearchQuery, StatsResponse, StudentOffer,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

/// Most recent log rows returned by `/api/logs`.
const LOG_PAGE: i64 = 500;

/// Every row of a registered table
#[utoipa::path(
    get,
    path = "/data/{table}",
    params(("table" = String, Path, description = "Table name (case-insensitive)")),
    responses(
        (status = 200, description = "Rows as JSON objects"),
        (status = 400, description = "Unknown table"),
        (status = 403, description = "LOGS requested by a non-admin")
    ),
    tag = "data"
)]
pub async fn read_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    user: AuthUser,
) -> Result<Json<Value>> {
    let schema = TableSchema::lookup(&table)
        .ok_or_else(|| AppError::InvalidInput(format!("Table {} does not exist.", table)))?;

    // same rule as /api/logs
    if schema.kind == TableKind::Logs {
        user.require_role(&[Role::Admin])?;
    }

    let rows = state.db.read_table(schema).await?;
    Ok(Json(json!({ "data": rows })))
}

/// Headline numbers for the dashboard
#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, description = "Dashboard statistics", body = StatsResponse)),
    tag = "data"
)]
pub async fn stats(State(state): State<AppState>, _user: AuthUser) -> Result<Json<StatsResponse>> {
    Ok(Json(state.db.stats().await?))
}

/// Applicants whose number or name contains the query
#[utoipa::path(
    get,
    path = "/api/students",
    params(("query" = Option<String>, Query, description = "Substring of app_no or name")),
    responses((status = 200, description = "Matching applicants with their offers", body = [StudentOffer])),
    tag = "data"
)]
pub async fn students(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
    _user: AuthUser,
) -> Result<Json<ListOrMessage<StudentOffer>>> {
    let rows = state.db.search_students(&params.query).await?;
    Ok(Json(ListOrMessage::from_rows(rows, "No students found.")))
}

/// Fee records whose app_no contains the query
#[utoipa::path(
    get,
    path = "/api/fees",
    params(("query" = Option<String>, Query, description = "Substring of app_no")),
    responses((status = 200, description = "Matching fee records", body = [FeeRecord])),
    tag = "data"
)]
pub async fn fees(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
    _user: AuthUser,
) -> Result<Json<Vec<FeeRecord>>> {
    Ok(Json(state.db.search_fees(&params.query).await?))
}

/// Number of recorded iterations
#[utoipa::path(
    get,
    path = "/api/iteration-count",
    responses((status = 200, description = "Iteration count", body = CountResponse)),
    tag = "data"
)]
pub async fn iteration_count(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<CountResponse>> {
    Ok(Json(CountResponse {
        count: state.db.iteration_count().await?,
    }))
}

/// Offers made in one iteration
#[utoipa::path(
    get,
    path = "/api/iterations",
    params(("iteration" = i64, Query, description = "Iteration number")),
    responses((status = 200, description = "Offers with applicant names", body = [StudentOffer])),
    tag = "data"
)]
pub async fn iterations(
    State(state): State<AppState>,
    Query(params): Query<IterationQuery>,
    _user: AuthUser,
) -> Result<Json<ListOrMessage<StudentOffer>>> {
    let rows = state.db.iteration_offers(params.iteration).await?;
    Ok(Json(ListOrMessage::from_rows(
        rows,
        &format!("No data found for iteration {}.", params.iteration),
    )))
}

/// Upload and withdrawal history, newest first
#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Log entries", body = [LogEntry]),
        (status = 403, description = "Caller is not an admin")
    ),
    tag = "data"
)]
pub async fn logs(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<LogEntry>>> {
    user.require_role(&[Role::Admin])?;
    Ok(Json(state.db.list_logs(LOG_PAGE).await?))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Server is up", body = String)),
    tag = "health"
)]
pub async fn health() -> &'static str {
    "OK"
}

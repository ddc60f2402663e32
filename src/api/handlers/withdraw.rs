use super::upload::{change_context, read_csv_upload};
use crate::{
    auth::middleware::{AuthUser, ClientIp},
    db::tables::WITHDRAW_LIST,
    types::{AppError, BulkWithdrawResponse, MessageResponse, Result, Role, WithdrawRequest},
    upload::{parse::parse_csv, withdraw_applicants, BULK_WITHDRAW_REMARK, SINGLE_WITHDRAW_REMARK},
    AppState,
};
use axum::{
    extract::{Multipart, State},
    Json,
};

const WITHDRAW_ROLES: [Role; 2] = [Role::Admin, Role::ViewAndWithdraw];

/// Withdraw one applicant from the latest iteration
#[utoipa::path(
    post,
    path = "/api/withdraw/student",
    request_body = WithdrawRequest,
    responses(
        (status = 200, description = "Applicant withdrawn", body = MessageResponse),
        (status = 403, description = "Role may not withdraw"),
        (status = 404, description = "No offer in the latest iteration")
    ),
    tag = "withdraw"
)]
pub async fn withdraw_student(
    State(state): State<AppState>,
    user: AuthUser,
    ip: ClientIp,
    Json(payload): Json<WithdrawRequest>,
) -> Result<Json<MessageResponse>> {
    user.require_role(&WITHDRAW_ROLES)?;

    let app_no = payload.app_no.trim();
    if app_no.is_empty() {
        return Err(AppError::InvalidInput(
            "Application number is required.".to_string(),
        ));
    }

    let ctx = change_context(&state, &user, app_no.to_string(), ip).await?;
    let outcome =
        withdraw_applicants(&state.db, &[app_no.to_string()], &ctx, SINGLE_WITHDRAW_REMARK).await?;

    if outcome.withdrawn == 0 {
        return Err(AppError::NotFound(format!(
            "No offer found for {} in the latest iteration.",
            app_no
        )));
    }

    Ok(Json(MessageResponse::new(format!(
        "Student {} withdrawn successfully.",
        app_no
    ))))
}

/// Withdraw every applicant listed in a CSV
#[utoipa::path(
    post,
    path = "/api/withdraw/upload",
    responses(
        (status = 200, description = "Withdrawal summary", body = BulkWithdrawResponse),
        (status = 400, description = "Malformed CSV"),
        (status = 403, description = "Role may not withdraw")
    ),
    tag = "withdraw"
)]
pub async fn withdraw_upload(
    State(state): State<AppState>,
    user: AuthUser,
    ip: ClientIp,
    mut multipart: Multipart,
) -> Result<Json<BulkWithdrawResponse>> {
    user.require_role(&WITHDRAW_ROLES)?;

    let (file_name, bytes) = read_csv_upload(&mut multipart).await?;
    let parsed = parse_csv(&WITHDRAW_LIST, &bytes)?;

    let mut app_nos: Vec<String> = Vec::with_capacity(parsed.len());
    for row in 0..parsed.len() {
        if let Some(app_no) = parsed.text(row, "app_no") {
            if !app_nos.contains(&app_no) {
                app_nos.push(app_no);
            }
        }
    }

    let ctx = change_context(&state, &user, file_name, ip).await?;
    let outcome = withdraw_applicants(&state.db, &app_nos, &ctx, BULK_WITHDRAW_REMARK).await?;

    Ok(Json(BulkWithdrawResponse {
        message: format!("Withdrew {} applicant(s).", outcome.withdrawn),
        withdrawn: outcome.withdrawn,
        missing: outcome.missing,
    }))
}

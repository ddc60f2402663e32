use crate::{
    auth::middleware::{AuthUser, ClientIp},
    db::TableSchema,
    types::{AppError, Result, Role, UploadResponse},
    upload::{apply_upload, parse::parse_csv, ChangeContext},
    AppState,
};
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    Json,
};

/// Multipart field carrying the CSV.
const FILE_FIELD: &str = "file";

/// Reads the `file` part of a multipart body.
pub(crate) async fn read_csv_upload(multipart: &mut Multipart) -> Result<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("upload.csv")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;

        return Ok((file_name, bytes));
    }

    Err(AppError::InvalidInput(format!(
        "A CSV file is required in the '{}' field.",
        FILE_FIELD
    )))
}

/// Builds the log context for a change made by `user`.
pub(crate) async fn change_context(
    state: &AppState,
    user: &AuthUser,
    file_name: String,
    ip: ClientIp,
) -> Result<ChangeContext> {
    let record = state
        .db
        .get_user_by_email(user.email())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(ChangeContext {
        uploaded_by: format!("{} {}", record.name, record.role),
        file_name,
        ip_address: ip.0,
    })
}

/// Upsert a CSV into an admission table and reconcile offer statuses
#[utoipa::path(
    post,
    path = "/update/{table}",
    params(("table" = String, Path, description = "Table name (case-insensitive)")),
    responses(
        (status = 200, description = "Rows written", body = UploadResponse),
        (status = 400, description = "Unknown table or malformed CSV"),
        (status = 403, description = "Caller is not an admin")
    ),
    tag = "upload"
)]
pub async fn upload_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    user: AuthUser,
    ip: ClientIp,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    user.require_role(&[Role::Admin])?;

    let schema = TableSchema::lookup(&table)
        .filter(|schema| schema.uploadable)
        .ok_or_else(|| AppError::InvalidInput(format!("Table {} does not exist.", table)))?;

    let (file_name, bytes) = read_csv_upload(&mut multipart).await?;
    let parsed = parse_csv(schema, &bytes)?;
    let ctx = change_context(&state, &user, file_name, ip).await?;

    let outcome = apply_upload(&state.db, parsed, &ctx).await?;

    Ok(Json(UploadResponse {
        message: format!("Data updated successfully in {}!", schema.name),
        rows: outcome.rows,
        reconciled: outcome.reconciled,
    }))
}

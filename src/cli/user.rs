//! Staff account provisioning from the command line
//!
//! `user create` bypasses the HTTP register route so the first admin can
//! be created before anyone can log in.

use super::output::Output;
use crate::auth::jwt::AuthService;
use crate::db::{AdmissionsDb, NewUser};
use crate::types::{AppError, Result, Role};
use crate::AdmissionsConfig;
use chrono::{TimeZone, Utc};

/// Arguments for `user create`
#[derive(Debug, Clone)]
pub struct CreateUserArgs {
    pub email: String,
    pub name: String,
    pub contact: String,
    pub campus: String,
    pub role: String,
    pub password: String,
}

/// Validate and insert a staff account. Returns the new user id.
pub async fn create(
    db: &AdmissionsDb,
    auth: &AuthService,
    config: &AdmissionsConfig,
    args: &CreateUserArgs,
    output: &Output,
) -> Result<String> {
    let email = args.email.trim();
    let name = args.name.trim();
    if email.is_empty() || name.is_empty() || args.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email, name and password are required.".to_string(),
        ));
    }

    if !config.auth.is_allowed_campus(&args.campus) {
        return Err(AppError::InvalidInput(format!(
            "Invalid campus selection. Allowed: {}",
            config.auth.allowed_campuses.join(", ")
        )));
    }

    let role: Role = args.role.parse()?;

    if db.get_user_by_email(email).await?.is_some() {
        return Err(AppError::InvalidInput("User already exists.".to_string()));
    }

    let hashed_password = auth.hash_password(&args.password)?;
    let id = db
        .create_user(&NewUser {
            name,
            email,
            contact: args.contact.trim(),
            campus: &args.campus,
            hashed_password: &hashed_password,
            role,
        })
        .await?;

    output.success(&format!("Created {} account for {}", role, email));
    output.kv("id", &id);

    Ok(id)
}

/// Print every account as a table.
pub async fn list(db: &AdmissionsDb, output: &Output) -> Result<usize> {
    let users = db.list_users().await?;

    if users.is_empty() {
        output.info("No accounts yet");
        output.hint("Create one with: admissions-server user create --role admin");
        return Ok(0);
    }

    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|user| {
            let created = Utc
                .timestamp_opt(user.created_at, 0)
                .single()
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            vec![
                user.email.clone(),
                user.name.clone(),
                user.campus.clone(),
                user.role.to_string(),
                created,
            ]
        })
        .collect();

    output.table(&["Email", "Name", "Campus", "Role", "Created"], &rows);
    Ok(users.len())
}

use crate::db::tables::{TableSchema, TABLES};
use crate::types::{AppError, Result, Role};
use chrono::Utc;
use libsql::{Builder, Connection, Database, Row, Rows, Value};
use tracing::{debug, info};

/// libsql handle for the admissions database.
///
/// File and remote databases open a fresh connection per call. In-memory
/// databases exist only as long as their connection, so a single shared
/// connection is handed out instead.
pub struct AdmissionsDb {
    db: Database,
    shared: Option<Connection>,
}

impl AdmissionsDb {
    /// Opens (creating if needed) a local SQLite file.
    pub async fn new_local(path: &str) -> Result<Self> {
        if path == ":memory:" {
            return Self::new_memory().await;
        }

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open {}: {}", path, e)))?;

        let client = Self { db, shared: None };
        client.initialize_schema().await?;
        info!(path, "Opened local admissions database");

        Ok(client)
    }

    /// Opens a private in-memory database (tests, dry runs).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory db: {}", e)))?;
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self {
            db,
            shared: Some(conn),
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    /// Connects to a remote Turso database.
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        let client = Self { db, shared: None };
        client.initialize_schema().await?;
        info!("Connected to remote admissions database");

        Ok(client)
    }

    /// Turso when both credential variables resolve, otherwise `database.url`.
    pub async fn from_config(config: &crate::AdmissionsConfig) -> Result<Self> {
        match config.turso_credentials() {
            Some((url, token)) => Self::new_remote(url, token).await,
            None => Self::new_local(&config.database.url).await,
        }
    }

    pub fn connection(&self) -> Result<Connection> {
        if let Some(conn) = &self.shared {
            return Ok(conn.clone());
        }
        self.db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                contact TEXT NOT NULL,
                campus TEXT NOT NULL,
                hashed_password TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS password_resets (
                token_hash TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                used_at INTEGER
            )",
            (),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to create password_resets table: {}", e))
        })?;

        for table in TABLES {
            conn.execute(&table.create_sql(), ())
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to create {} table: {}", table.name, e))
                })?;
        }

        debug!("Schema initialized");
        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<String> {
        let conn = self.connection()?;
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO users (id, name, email, contact, campus, hashed_password, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.as_str(),
                user.name,
                user.email,
                user.contact,
                user.campus,
                user.hashed_password,
                user.role.as_str(),
                Utc::now().timestamp(),
            ),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create user: {}", e)))?;

        Ok(id)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, name, email, contact, campus, hashed_password, role, created_at
                 FROM users WHERE email = ?",
                [email],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match rows.next().await? {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Every account, oldest first.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, name, email, contact, campus, hashed_password, role, created_at
                 FROM users ORDER BY created_at, email",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to list users: {}", e)))?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(user_from_row(&row)?);
        }
        Ok(users)
    }

    // Password reset operations
    pub async fn store_reset_token(
        &self,
        token_hash: &str,
        email: &str,
        expires_at: i64,
    ) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO password_resets (token_hash, email, expires_at, used_at)
             VALUES (?, ?, ?, NULL)",
            (token_hash, email, expires_at),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to store reset token: {}", e)))?;
        Ok(())
    }

    /// Uses a reset token and sets the new password in one transaction.
    ///
    /// The token is claimed with a guarded `UPDATE`, so of two concurrent
    /// redemptions only one sees a changed row. Nothing is committed unless
    /// the password change lands.
    pub async fn redeem_reset_token(
        &self,
        token_hash: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<ResetRedemption> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();
        let tx = conn.transaction().await?;

        let claimed = tx
            .execute(
                "UPDATE password_resets SET used_at = ?
                 WHERE token_hash = ? AND email = ? AND used_at IS NULL AND expires_at >= ?",
                (now, token_hash, email, now),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to claim reset token: {}", e)))?;
        if claimed == 0 {
            tx.rollback().await?;
            return Ok(ResetRedemption::TokenRejected);
        }

        let changed = tx
            .execute(
                "UPDATE users SET hashed_password = ? WHERE email = ?",
                (hashed_password, email),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update password: {}", e)))?;
        if changed == 0 {
            tx.rollback().await?;
            return Ok(ResetRedemption::UnknownUser);
        }

        tx.commit().await?;
        Ok(ResetRedemption::PasswordChanged)
    }

    /// All rows of a registered table as JSON objects keyed by column.
    pub async fn read_table(
        &self,
        table: &TableSchema,
    ) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        let conn = self.connection()?;
        let order = table.primary_key.join(", ");
        let mut rows = conn
            .query(
                &format!("SELECT * FROM \"{}\" ORDER BY {}", table.name, order),
                (),
            )
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read {}: {}", table.name, e))
            })?;

        rows_to_json(&mut rows).await
    }
}

/// Result of [`AdmissionsDb::redeem_reset_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRedemption {
    PasswordChanged,
    /// Unknown, expired, already used, or issued for another address.
    TokenRejected,
    UnknownUser,
}

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub contact: &'a str,
    pub campus: &'a str,
    pub hashed_password: &'a str,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub contact: String,
    pub campus: String,
    pub hashed_password: String,
    pub role: Role,
    pub created_at: i64,
}

// ============= Row helpers =============

fn user_from_row(row: &Row) -> Result<User> {
    let role: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        contact: row.get(3)?,
        campus: row.get(4)?,
        hashed_password: row.get(5)?,
        role: role.parse()?,
        created_at: row.get(7)?,
    })
}

pub(crate) async fn rows_to_json(
    rows: &mut Rows,
) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
    let names: Vec<String> = (0..rows.column_count())
        .map(|i| rows.column_name(i).unwrap_or_default().to_string())
        .collect();

    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        let mut object = serde_json::Map::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            object.insert(name.clone(), value_to_json(row.get_value(i as i32)?));
        }
        out.push(object);
    }
    Ok(out)
}

pub(crate) fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(n) => n.into(),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => s.into(),
        Value::Blob(b) => hex::encode(b).into(),
    }
}

/// Nullable text cell; numbers are rendered as strings.
pub(crate) fn opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    Ok(match row.get_value(idx)? {
        Value::Text(s) => Some(s),
        Value::Integer(n) => Some(n.to_string()),
        Value::Real(f) => Some(f.to_string()),
        _ => None,
    })
}

pub(crate) fn opt_int(row: &Row, idx: i32) -> Result<Option<i64>> {
    Ok(match row.get_value(idx)? {
        Value::Integer(n) => Some(n),
        Value::Real(f) => Some(f as i64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn opt_real(row: &Row, idx: i32) -> Result<Option<f64>> {
    Ok(match row.get_value(idx)? {
        Value::Integer(n) => Some(n as f64),
        Value::Real(f) => Some(f),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// `LIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("A1"), "%A1%");
        assert_eq!(contains_pattern(" 50%_x "), "%50\\%\\_x%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(Value::Null), serde_json::Value::Null);
        assert_eq!(value_to_json(Value::Integer(3)), serde_json::json!(3));
        assert_eq!(value_to_json(Value::Real(2.5)), serde_json::json!(2.5));
        assert_eq!(value_to_json(Value::Text("x".into())), serde_json::json!("x"));
        assert_eq!(value_to_json(Value::Real(f64::NAN)), serde_json::Value::Null);
    }
}

//! Statements shared by the upload, reconciliation and withdrawal paths.
//!
//! These take a bare [`Connection`] so they can run inside a
//! [`libsql::Transaction`] (which derefs to one).

use crate::db::tables::{FEES_PAID, ITERATION_DATE, ITERATION_OFFER, LOGS};
use crate::db::turso::{opt_int, opt_text};
use crate::reconcile::{FeeFlags, OfferSnapshot};
use crate::types::{AppError, LogEntry, Result};
use crate::upload::parse::ParsedTable;
use libsql::{params_from_iter, Connection, Value};

/// Timestamp format for stamped columns and `ITERATION_DATE.date`.
/// Sorts lexicographically in time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp_now() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Most recently recorded iteration and when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestIteration {
    pub iteration: i64,
    pub date: String,
}

/// Upserts every parsed row; returns the number of rows written.
///
/// Only columns present in the upload are updated on conflict. A
/// server-filled column left NULL for a row keeps the stored value.
pub async fn upsert_rows(conn: &Connection, table: &ParsedTable) -> Result<usize> {
    if table.is_empty() {
        return Ok(0);
    }

    let schema = table.schema;
    let names: Vec<&str> = table.columns.iter().map(|c| c.name).collect();
    let placeholders = vec!["?"; names.len()].join(", ");
    let updates: Vec<String> = names
        .iter()
        .filter(|name| !schema.is_key(name))
        .map(|name| {
            if table.server_filled.contains(name) {
                format!("{name} = COALESCE(excluded.{name}, \"{}\".{name})", schema.name)
            } else {
                format!("{name} = excluded.{name}")
            }
        })
        .collect();

    let on_conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) ON CONFLICT ({}) {}",
        schema.name,
        names.join(", "),
        placeholders,
        schema.primary_key.join(", "),
        on_conflict
    );

    for (i, row) in table.rows.iter().enumerate() {
        conn.execute(&sql, params_from_iter(row.iter().cloned()))
            .await
            .map_err(|e| {
                AppError::Database(format!("{} row {}: {}", schema.name, i + 1, e))
            })?;
    }

    Ok(table.len())
}

pub async fn latest_iteration(conn: &Connection) -> Result<Option<LatestIteration>> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT iteration, date FROM \"{}\" ORDER BY date DESC, iteration DESC LIMIT 1",
                ITERATION_DATE.name
            ),
            (),
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(opt_int(&row, 0)?.map(|iteration| LatestIteration {
            iteration,
            date: opt_text(&row, 1).ok().flatten().unwrap_or_default(),
        })),
        None => Ok(None),
    }
}

/// Records when an iteration was uploaded (upsert on the iteration number).
pub async fn record_iteration_date(conn: &Connection, iteration: i64, date: &str) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO \"{}\" (iteration, date) VALUES (?, ?)
             ON CONFLICT (iteration) DO UPDATE SET date = excluded.date",
            ITERATION_DATE.name
        ),
        (iteration, date),
    )
    .await?;
    Ok(())
}

/// The applicant's most recent offers, newest first.
pub async fn offer_history(
    conn: &Connection,
    app_no: &str,
    limit: i64,
) -> Result<Vec<OfferSnapshot>> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT itr_no, offer, status FROM \"{}\"
                 WHERE app_no = ? ORDER BY itr_no DESC LIMIT ?",
                ITERATION_OFFER.name
            ),
            (app_no, limit),
        )
        .await?;

    let mut history = Vec::new();
    while let Some(row) = rows.next().await? {
        history.push(OfferSnapshot {
            itr_no: opt_int(&row, 0)?.unwrap_or_default(),
            offer: opt_text(&row, 1)?,
            status: opt_text(&row, 2)?,
        });
    }
    Ok(history)
}

pub async fn offer_at(
    conn: &Connection,
    app_no: &str,
    iteration: i64,
) -> Result<Option<OfferSnapshot>> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT itr_no, offer, status FROM \"{}\" WHERE app_no = ? AND itr_no = ?",
                ITERATION_OFFER.name
            ),
            (app_no, iteration),
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(OfferSnapshot {
            itr_no: iteration,
            offer: opt_text(&row, 1)?,
            status: opt_text(&row, 2)?,
        })),
        None => Ok(None),
    }
}

/// Sets the status of one offer row; returns whether the row existed.
pub async fn set_offer_status(
    conn: &Connection,
    app_no: &str,
    iteration: i64,
    status: &str,
) -> Result<bool> {
    let changed = conn
        .execute(
            &format!(
                "UPDATE \"{}\" SET status = ? WHERE app_no = ? AND itr_no = ?",
                ITERATION_OFFER.name
            ),
            (status, app_no, iteration),
        )
        .await?;
    Ok(changed > 0)
}

/// Payment flags for every applicant in `FEES_PAID`.
pub async fn fee_flags(conn: &Connection) -> Result<Vec<(String, FeeFlags)>> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT app_no, admission_fees_status, tution_fees_status FROM \"{}\" ORDER BY app_no",
                FEES_PAID.name
            ),
            (),
        )
        .await?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        let Some(app_no) = opt_text(&row, 0)? else {
            continue;
        };
        let flags = FeeFlags::new(
            opt_int(&row, 1)?.unwrap_or_default() != 0,
            opt_int(&row, 2)?.unwrap_or_default() != 0,
        );
        out.push((app_no, flags));
    }
    Ok(out)
}

pub async fn insert_log(conn: &Connection, entry: &LogEntry) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO \"{}\" (file_name, category, upload_date, uploaded_by, remark, ip_address)
             VALUES (?, ?, ?, ?, ?, ?)",
            LOGS.name
        ),
        params_from_iter([
            Value::Text(entry.file_name.clone()),
            Value::Text(entry.category.clone()),
            Value::Text(entry.upload_date.clone()),
            Value::Text(entry.uploaded_by.clone()),
            Value::Text(entry.remark.clone()),
            entry
                .ip_address
                .clone()
                .map(Value::Text)
                .unwrap_or(Value::Null),
        ]),
    )
    .await
    .map_err(|e| AppError::Database(format!("Failed to write upload log: {}", e)))?;
    Ok(())
}

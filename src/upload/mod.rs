//! CSV uploads and withdrawals.
//!
//! Every change runs in one transaction: the rows, the status
//! reconciliation they trigger and the `LOGS` entry are committed together
//! or not at all.

pub mod parse;

use crate::db::queries::{
    insert_log, latest_iteration, set_offer_status, timestamp_now, upsert_rows,
};
use crate::db::tables::TableKind;
use crate::db::AdmissionsDb;
use crate::reconcile::apply::reconcile_after_upload;
use crate::reconcile::OfferStatus;
use crate::types::{AppError, LogEntry, Result};
use libsql::{Transaction, Value};
use parse::ParsedTable;
use tracing::{info, warn};

pub const UPLOAD_REMARK: &str = "Initial upload";
pub const WITHDRAW_CATEGORY: &str = "WITHDRAW";
pub const SINGLE_WITHDRAW_REMARK: &str = "Single withdrawal";
pub const BULK_WITHDRAW_REMARK: &str = "Bulk withdrawal";

/// Who made a change and from where, for the `LOGS` table.
#[derive(Debug, Clone)]
pub struct ChangeContext {
    /// `"<name> <role>"` of the staff member.
    pub uploaded_by: String,
    pub file_name: String,
    pub ip_address: Option<String>,
}

impl ChangeContext {
    fn log_entry(&self, category: &str, remark: &str) -> LogEntry {
        LogEntry {
            file_name: self.file_name.clone(),
            category: category.to_string(),
            upload_date: timestamp_now(),
            uploaded_by: self.uploaded_by.clone(),
            remark: remark.to_string(),
            ip_address: self.ip_address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub rows: usize,
    pub reconciled: usize,
    /// Iteration the statuses were reconciled against, if any.
    pub latest_iteration: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithdrawOutcome {
    pub withdrawn: usize,
    /// Applicants with no offer in the latest iteration.
    pub missing: Vec<String>,
}

/// Writes a parsed CSV, reconciles offer statuses and logs the upload.
pub async fn apply_upload(
    db: &AdmissionsDb,
    mut table: ParsedTable,
    ctx: &ChangeContext,
) -> Result<UploadOutcome> {
    let schema = table.schema;
    if !schema.uploadable {
        return Err(AppError::InvalidInput(format!(
            "Table {} does not accept uploads.",
            schema.name
        )));
    }

    if schema.kind == TableKind::FeesPaid {
        stamp_fee_uploads(&mut table, &ctx.uploaded_by, &timestamp_now())?;
    }

    let conn = db.connection()?;
    let tx = conn.transaction().await?;

    let result = async {
        let rows = upsert_rows(&tx, &table).await?;
        let summary = reconcile_after_upload(&tx, &table).await?;
        insert_log(&tx, &ctx.log_entry(schema.name, UPLOAD_REMARK)).await?;
        Ok::<_, AppError>(UploadOutcome {
            rows,
            reconciled: summary.updated,
            latest_iteration: summary.latest_iteration,
        })
    }
    .await;

    let outcome = finish(tx, result).await?;
    info!(
        table = schema.name,
        rows = outcome.rows,
        reconciled = outcome.reconciled,
        latest_iteration = ?outcome.latest_iteration,
        uploaded_by = %ctx.uploaded_by,
        "Upload committed"
    );
    Ok(outcome)
}

/// Sets `withdraw` on each applicant's latest-iteration offer.
///
/// A log row is written only when something was withdrawn.
pub async fn withdraw_applicants(
    db: &AdmissionsDb,
    app_nos: &[String],
    ctx: &ChangeContext,
    remark: &str,
) -> Result<WithdrawOutcome> {
    let conn = db.connection()?;
    let tx = conn.transaction().await?;

    let result = async {
        let Some(latest) = latest_iteration(&tx).await? else {
            return Ok(WithdrawOutcome {
                withdrawn: 0,
                missing: app_nos.to_vec(),
            });
        };

        let mut outcome = WithdrawOutcome::default();
        for app_no in app_nos {
            if set_offer_status(&tx, app_no, latest.iteration, OfferStatus::Withdraw.as_str())
                .await?
            {
                outcome.withdrawn += 1;
            } else {
                outcome.missing.push(app_no.clone());
            }
        }

        if outcome.withdrawn > 0 {
            insert_log(&tx, &ctx.log_entry(WITHDRAW_CATEGORY, remark)).await?;
        }
        Ok::<_, AppError>(outcome)
    }
    .await;

    let outcome = finish(tx, result).await?;
    if !outcome.missing.is_empty() {
        warn!(missing = ?outcome.missing, "Withdrawal skipped unknown applicants");
    }
    info!(withdrawn = outcome.withdrawn, by = %ctx.uploaded_by, "Withdrawal committed");
    Ok(outcome)
}

async fn finish<T>(tx: Transaction, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// Records who uploaded each paid fee, and when.
pub fn stamp_fee_uploads(table: &mut ParsedTable, uploaded_by: &str, now: &str) -> Result<()> {
    const PAIRS: [(&str, &str, &str); 2] = [
        (
            "admission_fees_status",
            "admission_fees_uploaded_by",
            "admission_fees_upload_date_time",
        ),
        (
            "tution_fees_status",
            "tution_fees_uploaded_by",
            "tution_fees_upload_date_time",
        ),
    ];

    for row in 0..table.len() {
        for (flag, by, at) in PAIRS {
            if table.flag(row, flag) {
                table.set(row, by, Value::Text(uploaded_by.to_string()))?;
                table.set(row, at, Value::Text(now.to_string()))?;
            }
        }
    }
    Ok(())
}

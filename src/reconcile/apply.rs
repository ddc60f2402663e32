use super::{status_after_fee_upload, status_after_iteration_upload, FeeFlags};
use crate::db::queries::{
    fee_flags, latest_iteration, offer_at, offer_history, record_iteration_date,
    set_offer_status, timestamp_now, LatestIteration,
};
use crate::db::tables::TableKind;
use crate::types::Result;
use crate::upload::parse::ParsedTable;
use libsql::Connection;
use tracing::{debug, info};

/// Offers considered when deciding whether an applicant was upgraded.
const HISTORY_DEPTH: i64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub latest_iteration: Option<i64>,
    /// Offer rows whose status was rewritten.
    pub updated: usize,
}

/// Runs the table-specific follow-up of an upload that has already been
/// written through `conn`.
pub async fn reconcile_after_upload(
    conn: &Connection,
    table: &ParsedTable,
) -> Result<ReconcileSummary> {
    match table.schema.kind {
        TableKind::IterationOffer => after_iteration_upload(conn, table).await,
        TableKind::FeesPaid => after_fee_upload(conn, table).await,
        _ => Ok(ReconcileSummary::default()),
    }
}

async fn after_iteration_upload(conn: &Connection, table: &ParsedTable) -> Result<ReconcileSummary> {
    if let Some(iteration) = table
        .value(0, "itr_no")
        .and_then(|v| match v {
            libsql::Value::Integer(n) => Some(*n),
            _ => None,
        })
    {
        record_iteration_date(conn, iteration, &timestamp_now()).await?;
        debug!(iteration, "Recorded iteration date");
    }

    let Some(LatestIteration { iteration, .. }) = latest_iteration(conn).await? else {
        return Ok(ReconcileSummary::default());
    };

    let mut updated = 0;
    for (app_no, flags) in fee_flags(conn).await? {
        let history = offer_history(conn, &app_no, HISTORY_DEPTH).await?;
        if let Some(status) = status_after_iteration_upload(flags, &history) {
            if set_offer_status(conn, &app_no, iteration, status.as_str()).await? {
                updated += 1;
            }
        }
    }

    info!(iteration, updated, "Reconciled offers after iteration upload");
    Ok(ReconcileSummary {
        latest_iteration: Some(iteration),
        updated,
    })
}

async fn after_fee_upload(conn: &Connection, table: &ParsedTable) -> Result<ReconcileSummary> {
    let Some(LatestIteration { iteration, .. }) = latest_iteration(conn).await? else {
        debug!("No iterations recorded, skipping fee reconciliation");
        return Ok(ReconcileSummary::default());
    };

    let mut updated = 0;
    for row in 0..table.len() {
        let Some(app_no) = table.text(row, "app_no") else {
            continue;
        };
        let flags = FeeFlags::new(
            table.flag(row, "admission_fees_status"),
            table.flag(row, "tution_fees_status"),
        );

        let history = offer_history(conn, &app_no, HISTORY_DEPTH).await?;
        let current = offer_at(conn, &app_no, iteration).await?;
        let latest_offer = current.as_ref().and_then(|o| o.offer.as_deref());

        let status = status_after_fee_upload(flags, &history, latest_offer);
        if set_offer_status(conn, &app_no, iteration, status.as_str()).await? {
            updated += 1;
        }
    }

    info!(iteration, updated, "Reconciled offers after fee upload");
    Ok(ReconcileSummary {
        latest_iteration: Some(iteration),
        updated,
    })
}

//! Read-only queries behind the dashboard endpoints.

use crate::db::queries::latest_iteration;
use crate::db::tables::{FEES_PAID, ITERATION_DATE, ITERATION_OFFER, LOGS, MASTER_TABLE};
use crate::db::turso::{contains_pattern, opt_int, opt_real, opt_text, AdmissionsDb};
use crate::types::{FeeRecord, LogEntry, Result, StatsResponse, StudentOffer};
use libsql::Row;
use std::collections::BTreeMap;

impl AdmissionsDb {
    pub async fn stats(&self) -> Result<StatsResponse> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM \"{}\"", MASTER_TABLE.name), ())
            .await?;
        let total_applications = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };

        let latest = latest_iteration(&conn).await?;

        let accepted_students = match &latest {
            Some(latest) => {
                let mut rows = conn
                    .query(
                        &format!(
                            "SELECT COUNT(*) FROM \"{}\" WHERE itr_no = ? AND status LIKE 'accept%'",
                            ITERATION_OFFER.name
                        ),
                        [latest.iteration],
                    )
                    .await?;
                match rows.next().await? {
                    Some(row) => row.get::<i64>(0)?,
                    None => 0,
                }
            }
            None => 0,
        };

        let mut rows = conn
            .query(
                &format!(
                    "SELECT COALESCE(gender, 'Unknown'), COUNT(*) FROM \"{}\" GROUP BY 1",
                    MASTER_TABLE.name
                ),
                (),
            )
            .await?;
        let mut gender_stats = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let gender = opt_text(&row, 0)?.unwrap_or_else(|| "Unknown".to_string());
            gender_stats.insert(gender, row.get::<i64>(1)?);
        }

        Ok(StatsResponse {
            total_applications,
            accepted_students,
            latest_iteration_number: latest.as_ref().map(|l| l.iteration),
            latest_iteration_date: latest.map(|l| l.date),
            gender_stats,
        })
    }

    /// Applicants whose number or name contains `query`, with their offers.
    pub async fn search_students(&self, query: &str) -> Result<Vec<StudentOffer>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT m.app_no, m.name, o.itr_no, o.offer, o.scholarship, o.status
                     FROM \"{}\" m LEFT JOIN \"{}\" o ON o.app_no = m.app_no
                     WHERE m.app_no LIKE ?1 ESCAPE '\\' OR m.name LIKE ?1 ESCAPE '\\'
                     ORDER BY m.app_no, o.itr_no",
                    MASTER_TABLE.name, ITERATION_OFFER.name
                ),
                [contains_pattern(query)],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(student_offer(&row)?);
        }
        Ok(out)
    }

    /// Offers made in one iteration, joined with applicant names.
    pub async fn iteration_offers(&self, iteration: i64) -> Result<Vec<StudentOffer>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT o.app_no, m.name, o.itr_no, o.offer, o.scholarship, o.status
                     FROM \"{}\" o LEFT JOIN \"{}\" m ON m.app_no = o.app_no
                     WHERE o.itr_no = ? ORDER BY o.app_no",
                    ITERATION_OFFER.name, MASTER_TABLE.name
                ),
                [iteration],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(student_offer(&row)?);
        }
        Ok(out)
    }

    pub async fn search_fees(&self, query: &str) -> Result<Vec<FeeRecord>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT app_no, admission_fees_amount, admission_fees_status,
                            admission_fees_paid_date, admission_fees_uploaded_by,
                            admission_fees_upload_date_time, tution_fees_amount,
                            tution_fees_status, tution_fees_paid_date,
                            tution_fees_uploaded_by, tution_fees_upload_date_time
                     FROM \"{}\" WHERE app_no LIKE ? ESCAPE '\\' ORDER BY app_no",
                    FEES_PAID.name
                ),
                [contains_pattern(query)],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(FeeRecord {
                app_no: opt_text(&row, 0)?.unwrap_or_default(),
                admission_fees_amount: opt_real(&row, 1)?,
                admission_fees_status: opt_int(&row, 2)?.unwrap_or_default() != 0,
                admission_fees_paid_date: opt_text(&row, 3)?,
                admission_fees_uploaded_by: opt_text(&row, 4)?,
                admission_fees_upload_date_time: opt_text(&row, 5)?,
                tution_fees_amount: opt_real(&row, 6)?,
                tution_fees_status: opt_int(&row, 7)?.unwrap_or_default() != 0,
                tution_fees_paid_date: opt_text(&row, 8)?,
                tution_fees_uploaded_by: opt_text(&row, 9)?,
                tution_fees_upload_date_time: opt_text(&row, 10)?,
            });
        }
        Ok(out)
    }

    pub async fn iteration_count(&self) -> Result<i64> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM \"{}\"", ITERATION_DATE.name), ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Upload log, newest first.
    pub async fn list_logs(&self, limit: i64) -> Result<Vec<LogEntry>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT file_name, category, upload_date, uploaded_by, remark, ip_address
                     FROM \"{}\" ORDER BY id DESC LIMIT ?",
                    LOGS.name
                ),
                [limit],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(LogEntry {
                file_name: row.get(0)?,
                category: row.get(1)?,
                upload_date: row.get(2)?,
                uploaded_by: row.get(3)?,
                remark: row.get(4)?,
                ip_address: opt_text(&row, 5)?,
            });
        }
        Ok(out)
    }
}

fn student_offer(row: &Row) -> Result<StudentOffer> {
    Ok(StudentOffer {
        app_no: opt_text(row, 0)?.unwrap_or_default(),
        name: opt_text(row, 1)?,
        itr_no: opt_int(row, 2)?,
        offer: opt_text(row, 3)?,
        scholarship: opt_text(row, 4)?,
        status: opt_text(row, 5)?,
    })
}

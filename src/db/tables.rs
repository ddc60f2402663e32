//! Registry of the admission tables exposed through the generic read and
//! upload endpoints.
//!
//! Column names double as CSV headers, so they are kept exactly as the
//! admissions office exports them (including `tution_`).

/// Storage type of a column, used when coercing CSV cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Paid/unpaid style boolean, stored as 0/1.
    Flag,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer | ColumnType::Flag => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    /// Filled in by the server; a CSV may omit it.
    pub stamped: bool,
}

const fn col(name: &'static str, kind: ColumnType) -> Column {
    Column {
        name,
        kind,
        stamped: false,
    }
}

const fn stamped(name: &'static str, kind: ColumnType) -> Column {
    Column {
        name,
        kind,
        stamped: true,
    }
}

/// Tables with upload side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Master,
    IterationOffer,
    IterationDate,
    FeesPaid,
    Logs,
    /// Virtual table describing withdrawal CSVs; never stored.
    WithdrawList,
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub kind: TableKind,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    /// Whether `POST /update/{table}` may write to it.
    pub uploadable: bool,
}

use ColumnType::{Flag, Integer, Real, Text};

pub static MASTER_TABLE: TableSchema = TableSchema {
    name: "MASTER_TABLE",
    kind: TableKind::Master,
    columns: &[
        col("app_no", Text),
        col("name", Text),
        col("gender", Text),
        col("email", Text),
        col("contact", Text),
    ],
    primary_key: &["app_no"],
    uploadable: true,
};

pub static ITERATION_OFFER: TableSchema = TableSchema {
    name: "ITERATION_OFFER",
    kind: TableKind::IterationOffer,
    columns: &[
        col("app_no", Text),
        col("itr_no", Integer),
        col("offer", Text),
        col("scholarship", Text),
        col("status", Text),
    ],
    primary_key: &["app_no", "itr_no"],
    uploadable: true,
};

pub static ITERATION_DATE: TableSchema = TableSchema {
    name: "ITERATION_DATE",
    kind: TableKind::IterationDate,
    columns: &[col("iteration", Integer), col("date", Text)],
    primary_key: &["iteration"],
    uploadable: true,
};

pub static FEES_PAID: TableSchema = TableSchema {
    name: "FEES_PAID",
    kind: TableKind::FeesPaid,
    columns: &[
        col("app_no", Text),
        col("admission_fees_amount", Real),
        col("admission_fees_status", Flag),
        col("admission_fees_paid_date", Text),
        stamped("admission_fees_uploaded_by", Text),
        stamped("admission_fees_upload_date_time", Text),
        col("tution_fees_amount", Real),
        col("tution_fees_status", Flag),
        col("tution_fees_paid_date", Text),
        stamped("tution_fees_uploaded_by", Text),
        stamped("tution_fees_upload_date_time", Text),
    ],
    primary_key: &["app_no"],
    uploadable: true,
};

pub static LOGS: TableSchema = TableSchema {
    name: "LOGS",
    kind: TableKind::Logs,
    columns: &[
        col("id", Integer),
        col("file_name", Text),
        col("category", Text),
        col("upload_date", Text),
        col("uploaded_by", Text),
        col("remark", Text),
        col("ip_address", Text),
    ],
    primary_key: &["id"],
    uploadable: false,
};

/// Shape of a bulk withdrawal CSV.
pub static WITHDRAW_LIST: TableSchema = TableSchema {
    name: "WITHDRAW",
    kind: TableKind::WithdrawList,
    columns: &[col("app_no", Text)],
    primary_key: &["app_no"],
    uploadable: false,
};

/// Every stored table, in creation order.
pub static TABLES: [&TableSchema; 5] =
    [&MASTER_TABLE, &ITERATION_OFFER, &ITERATION_DATE, &FEES_PAID, &LOGS];

impl TableSchema {
    /// Case-insensitive lookup of a stored table.
    pub fn lookup(name: &str) -> Option<&'static TableSchema> {
        TABLES
            .iter()
            .copied()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns a CSV must provide.
    pub fn required_columns(&self) -> impl Iterator<Item = &'static Column> {
        self.columns.iter().filter(|c| !c.stamped)
    }

    pub fn is_key(&self, column: &str) -> bool {
        self.primary_key.contains(&column)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_sql(&self) -> String {
        if self.kind == TableKind::Logs {
            return format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    upload_date TEXT NOT NULL,
                    uploaded_by TEXT NOT NULL,
                    remark TEXT NOT NULL,
                    ip_address TEXT
                )",
                self.name
            );
        }

        let columns = self
            .columns
            .iter()
            .map(|c| {
                let not_null = if self.is_key(c.name) { " NOT NULL" } else { "" };
                format!("{} {}{}", c.name, c.kind.sql(), not_null)
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({}, PRIMARY KEY ({}))",
            self.name,
            columns,
            self.primary_key.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(TableSchema::lookup("fees_paid").unwrap().name, "FEES_PAID");
        assert_eq!(
            TableSchema::lookup("Iteration_Offer").unwrap().kind,
            TableKind::IterationOffer
        );
        assert!(TableSchema::lookup("users").is_none());
        assert!(TableSchema::lookup("password_resets").is_none());
        assert!(TableSchema::lookup("WITHDRAW").is_none());
    }

    #[test]
    fn test_stamped_columns_are_not_required() {
        let required: Vec<_> = FEES_PAID.required_columns().map(|c| c.name).collect();
        assert!(required.contains(&"admission_fees_status"));
        assert!(!required.contains(&"admission_fees_uploaded_by"));
        assert!(!required.contains(&"tution_fees_upload_date_time"));
    }

    #[test]
    fn test_composite_primary_key_sql() {
        let sql = ITERATION_OFFER.create_sql();
        assert!(sql.contains("PRIMARY KEY (app_no, itr_no)"));
        assert!(sql.contains("itr_no INTEGER NOT NULL"));
    }

    #[test]
    fn test_logs_are_read_only() {
        assert!(!LOGS.uploadable);
        assert!(LOGS.create_sql().contains("AUTOINCREMENT"));
    }
}

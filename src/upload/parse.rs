//! CSV decoding into typed rows for a [`TableSchema`].

use crate::db::tables::{Column, ColumnType, TableSchema};
use crate::types::{AppError, Result};
use libsql::Value;

/// Cells treated as missing values.
const NULL_MARKERS: [&str; 5] = ["nan", "NaN", "NULL", "null", "None"];

/// Rows decoded from an uploaded CSV, restricted to the schema's columns.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub schema: &'static TableSchema,
    /// Schema columns present in the file, in schema order.
    pub columns: Vec<&'static Column>,
    pub rows: Vec<Vec<Value>>,
    /// Columns the server added after parsing. A NULL in one of these means
    /// "not filled for this row", not "clear the stored value".
    pub server_filled: Vec<&'static str>,
}

impl ParsedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Cell of `row` in column `name`, `None` when the column is absent.
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Text of a cell, with integers rendered as digits.
    pub fn text(&self, row: usize, name: &str) -> Option<String> {
        match self.value(row, name)? {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Real(f) => Some(f.to_string()),
            _ => None,
        }
    }

    pub fn flag(&self, row: usize, name: &str) -> bool {
        self.value(row, name).map(is_truthy).unwrap_or(false)
    }

    /// Writes a cell, adding the column (NULL elsewhere) if the file lacked it.
    pub fn set(&mut self, row: usize, name: &str, value: Value) -> Result<()> {
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                let column = self.schema.column(name).ok_or_else(|| {
                    AppError::Internal(format!("{} has no column {}", self.schema.name, name))
                })?;
                self.columns.push(column);
                self.server_filled.push(column.name);
                for r in &mut self.rows {
                    r.push(Value::Null);
                }
                self.columns.len() - 1
            }
        };

        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(idx)) {
            *cell = value;
        }
        Ok(())
    }
}

/// Decodes `bytes` as a headed CSV for `schema`.
///
/// Every non-stamped column must be present; extra columns are ignored.
pub fn parse_csv(schema: &'static TableSchema, bytes: &[u8]) -> Result<ParsedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::InvalidInput(format!("Unreadable CSV header: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    let missing: Vec<&str> = schema
        .required_columns()
        .map(|c| c.name)
        .filter(|name| !headers.iter().any(|h| h == name))
        .collect();
    if !missing.is_empty() {
        let expected: Vec<&str> = schema.required_columns().map(|c| c.name).collect();
        return Err(AppError::InvalidInput(format!(
            "CSV must contain columns: {:?} (missing {:?})",
            expected, missing
        )));
    }

    let (columns, positions): (Vec<&'static Column>, Vec<usize>) = schema
        .columns
        .iter()
        .filter_map(|c| headers.iter().position(|h| h == c.name).map(|pos| (c, pos)))
        .unzip();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        // header is line 1
        let line = line + 2;
        let record =
            record.map_err(|e| AppError::InvalidInput(format!("CSV line {}: {}", line, e)))?;

        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let row = columns
            .iter()
            .zip(&positions)
            .map(|(column, &pos)| coerce(column, record.get(pos).unwrap_or(""), line))
            .collect::<Result<Vec<_>>>()?;

        if let Some(key) = columns
            .iter()
            .zip(&row)
            .find(|(c, v)| schema.is_key(c.name) && matches!(v, Value::Null))
            .map(|(c, _)| c.name)
        {
            return Err(AppError::InvalidInput(format!(
                "CSV line {}: missing value for key column {}",
                line, key
            )));
        }
        rows.push(row);
    }

    Ok(ParsedTable {
        schema,
        columns,
        rows,
        server_filled: Vec::new(),
    })
}

fn coerce(column: &Column, raw: &str, line: usize) -> Result<Value> {
    if raw.is_empty() || NULL_MARKERS.contains(&raw) {
        return Ok(Value::Null);
    }

    let invalid = || {
        AppError::InvalidInput(format!(
            "CSV line {}: invalid value {:?} for column {}",
            line, raw, column.name
        ))
    };

    match column.kind {
        ColumnType::Text => Ok(Value::Text(raw.to_string())),
        ColumnType::Integer => parse_integer(raw).map(Value::Integer).ok_or_else(invalid),
        ColumnType::Real => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Real)
            .ok_or_else(invalid),
        ColumnType::Flag => parse_flag(raw)
            .map(|b| Value::Integer(b as i64))
            .ok_or_else(invalid),
    }
}

// -2^63 is exact as an f64; 2^63 is the first value past i64::MAX.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Accepts `"3"` and spreadsheet-style `"3.0"`.
fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(f))
            .map(|f| f as i64)
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "y" | "paid" => Some(true),
        "0" | "0.0" | "false" | "no" | "n" | "unpaid" => Some(false),
        _ => None,
    }
}

/// Truthiness of a stored flag cell.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Integer(n) => *n != 0,
        Value::Real(f) => *f != 0.0,
        Value::Text(s) => parse_flag(s).unwrap_or(false),
        _ => false,
    }
}

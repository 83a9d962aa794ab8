// ============================================================
// RAW TABLE
// ============================================================
// A parsed CSV exactly as uploaded: original headers, string cells

use serde::{Deserialize, Serialize};

/// Cell values that count as missing, compared case-insensitively after trimming.
const NULL_MARKERS: &[&str] = &["", "na", "n/a", "#n/a", "nan", "null", "none", "<na>"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Header row as written in the file
    pub headers: Vec<String>,

    /// Data rows; short rows are allowed and read as missing cells
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Convenience constructor for literal tables.
    pub fn from_literal(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `(row, column)`, or `None` when the cell is absent or a null marker.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        let value = self.rows.get(row)?.get(column)?.trim();
        if is_null_marker(value) {
            None
        } else {
            Some(value)
        }
    }
}

pub fn is_null_marker(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

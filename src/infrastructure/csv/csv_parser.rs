// ============================================================
// CSV PARSER
// ============================================================
// Parse uploaded CSV bytes with encoding and delimiter detection

use csv::{ReaderBuilder, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::path::Path;

use crate::domain::csv::RawTable;
use crate::domain::error::{AppError, Result};

/// CSV parser with encoding and delimiter detection. Cells are always trimmed.
#[derive(Debug, Default)]
pub struct CsvParser {
    /// Delimiter character; `None` means detect from the content
    delimiter: Option<u8>,
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fixed delimiter instead of detecting one
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Parse a CSV file from disk
    pub fn parse_file(&self, path: &Path) -> Result<RawTable> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::Parse(format!("Failed to read CSV {}: {}", path.display(), e))
        })?;
        self.parse_bytes(&bytes)
    }

    /// Parse raw CSV bytes (UTF-8 with optional BOM, Windows-1252 fallback)
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<RawTable> {
        let content = decode(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<RawTable> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Parse(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(AppError::Parse("CSV has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::Parse(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable::new(headers, rows))
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];
        let sample_lines: Vec<&str> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(10)
            .collect();

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// Decode bytes as UTF-8 (BOM stripped); fall back to Windows-1252 for legacy
/// spreadsheet exports that are not valid UTF-8.
fn decode(bytes: &[u8]) -> String {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "company,product_model,feature,price\nA,M1,base,100\nB,M2,pro,130";
        let table = CsvParser::new().parse_content(content).unwrap();

        assert_eq!(table.headers, vec!["company", "product_model", "feature", "price"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["A", "M1", "base", "100"]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\tc\nd\te\tf"), b'\t');
    }

    #[test]
    fn test_semicolon_with_decimal_comma() {
        let content = "Azienda;Modello;Caratteristica;Prezzo\nA;M1;base;100,50\n";
        let table = CsvParser::new().parse_content(content).unwrap();
        assert_eq!(table.headers[3], "Prezzo");
        assert_eq!(table.rows[0][3], "100,50");
    }

    #[test]
    fn test_quoted_fields_and_blank_lines() {
        let content = "company,feature,price\n\"Acme, Inc.\",\"pro \"\"plus\"\"\",10\n\n,,\nB,base,5\n";
        let table = CsvParser::new().with_delimiter(b',').parse_content(content).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], "Acme, Inc.");
        assert_eq!(table.rows[0][1], "pro \"plus\"");
    }

    #[test]
    fn test_utf8_bom_is_removed() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"company,price\nA,1\n");
        let table = CsvParser::new().parse_bytes(&bytes).unwrap();
        assert_eq!(table.headers[0], "company");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "price (€)" with € encoded as 0x80 in Windows-1252
        let bytes = b"company,price (\x80)\nA,1\n";
        let table = CsvParser::new().parse_bytes(bytes).unwrap();
        assert_eq!(table.headers[1], "price (€)");
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = CsvParser::new().parse_content("").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_short_rows_are_kept() {
        let table = CsvParser::new()
            .parse_content("company,feature,price\nA,base\n")
            .unwrap();
        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.cell(0, 2), None);
    }
}

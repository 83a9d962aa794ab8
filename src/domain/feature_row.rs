use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raw input value as it arrives from a form, JSON body or CLI flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Text form used when a value feeds a categorical field.
    pub fn as_category(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            FieldValue::Number(n) => Some(n.to_string()),
        }
    }

    /// Numeric form used when a value feeds a numeric field.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.is_finite().then_some(*n),
            FieldValue::Text(s) => parse_number(s),
        }
    }
}

/// One model input: categorical values by field name plus numeric values by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub categorical: BTreeMap<String, String>,
    pub numeric: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.categorical.insert(field.into(), value.into());
        self
    }

    pub fn with_numeric(mut self, field: impl Into<String>, value: f64) -> Self {
        self.numeric.insert(field.into(), value);
        self
    }

    pub fn category(&self, field: &str) -> Option<&str> {
        self.categorical.get(field).map(String::as_str)
    }

    pub fn numeric(&self, field: &str) -> Option<f64> {
        self.numeric.get(field).copied()
    }
}

/// A cleaned observation: features plus the finite target price.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub features: FeatureRow,
    pub target: f64,
}

/// Parses a cell as a finite number.
///
/// Accepts plain decimals and the decimal-comma form (`"12,5"`) when the value has a
/// single comma and no dot. Anything else, including `NaN` and infinities, is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = trimmed.parse::<f64>().ok().or_else(|| {
        if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
            trimmed.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;

    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_plain_and_comma() {
        assert_eq!(parse_number("100"), Some(100.0));
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("-3e2"), Some(-300.0));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("1,234.5"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::Text(" A ".into()).as_category(), Some("A".into()));
        assert_eq!(FieldValue::Text("   ".into()).as_category(), None);
        assert_eq!(FieldValue::Number(3.0).as_category(), Some("3".into()));
        assert_eq!(FieldValue::Text("42".into()).as_number(), Some(42.0));
        assert_eq!(FieldValue::Number(f64::NAN).as_number(), None);
    }

    #[test]
    fn test_field_value_untagged_json() {
        let values: BTreeMap<String, Option<FieldValue>> =
            serde_json::from_str(r#"{"company":"A","size":42,"missing":null}"#).unwrap();
        assert_eq!(values["company"], Some(FieldValue::Text("A".into())));
        assert_eq!(values["size"], Some(FieldValue::Number(42.0)));
        assert_eq!(values["missing"], None);
    }

    #[test]
    fn test_feature_row_builder() {
        let row = FeatureRow::new()
            .with_category("company", "A")
            .with_numeric("size", 42.0);
        assert_eq!(row.category("company"), Some("A"));
        assert_eq!(row.numeric("size"), Some(42.0));
        assert_eq!(row.category("feature"), None);
    }
}

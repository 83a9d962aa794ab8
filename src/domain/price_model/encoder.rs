use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::feature_row::FeatureRow;

/// Distinct values seen for one categorical field, sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub field: String,
    pub values: Vec<String>,
}

impl Vocabulary {
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values
            .binary_search_by(|probe| probe.as_str().cmp(value))
            .ok()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One-hot encoder over a fixed list of categorical fields.
///
/// Columns are laid out field by field in the order the fields were given, and within a
/// field in sorted value order, so the layout never depends on training row order.
/// A value outside the vocabulary encodes to all zeros for its field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<Vocabulary>,
}

impl OneHotEncoder {
    pub fn fit(fields: &[String], rows: &[FeatureRow]) -> Self {
        let vocabularies = fields
            .iter()
            .map(|field| {
                let values: BTreeSet<&str> =
                    rows.iter().filter_map(|row| row.category(field)).collect();
                Vocabulary {
                    field: field.clone(),
                    values: values.into_iter().map(str::to_string).collect(),
                }
            })
            .collect();

        Self { vocabularies }
    }

    pub fn width(&self) -> usize {
        self.vocabularies.iter().map(Vocabulary::len).sum()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.vocabularies.iter().map(|v| v.field.as_str())
    }

    pub fn vocabularies(&self) -> &[Vocabulary] {
        &self.vocabularies
    }

    pub fn vocabulary(&self, field: &str) -> Option<&Vocabulary> {
        self.vocabularies.iter().find(|v| v.field == field)
    }

    /// Writes the one-hot block for `row` into `out`, which must be `width()` long and zeroed.
    /// Returns the fields whose value was missing or unseen.
    pub fn encode_into(&self, row: &FeatureRow, out: &mut [f64]) -> Vec<String> {
        let mut unmatched = Vec::new();
        let mut offset = 0;
        for vocabulary in &self.vocabularies {
            match row
                .category(&vocabulary.field)
                .and_then(|value| vocabulary.index_of(value))
            {
                Some(index) => out[offset + index] = 1.0,
                None => unmatched.push(vocabulary.field.clone()),
            }
            offset += vocabulary.len();
        }
        unmatched
    }

    /// `field=value` labels for every encoded column.
    pub fn column_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|v| v.values.iter().map(move |value| format!("{}={}", v.field, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<FeatureRow> {
        vec![
            FeatureRow::new().with_category("company", "B").with_category("feature", "pro"),
            FeatureRow::new().with_category("company", "A").with_category("feature", "base"),
            FeatureRow::new().with_category("company", "B").with_category("feature", "base"),
        ]
    }

    fn fields() -> Vec<String> {
        vec!["company".to_string(), "feature".to_string()]
    }

    #[test]
    fn test_vocabulary_is_sorted_and_deduplicated() {
        let encoder = OneHotEncoder::fit(&fields(), &rows());
        assert_eq!(encoder.width(), 4);
        assert_eq!(
            encoder.column_names(),
            vec!["company=A", "company=B", "feature=base", "feature=pro"]
        );
    }

    #[test]
    fn test_encode_known_values() {
        let encoder = OneHotEncoder::fit(&fields(), &rows());
        let mut out = vec![0.0; encoder.width()];
        let unmatched = encoder.encode_into(
            &FeatureRow::new().with_category("company", "B").with_category("feature", "base"),
            &mut out,
        );
        assert_eq!(out, vec![0.0, 1.0, 1.0, 0.0]);
        assert!(unmatched.is_empty());
    }

    #[test]
    fn test_unseen_and_missing_encode_to_zero() {
        let encoder = OneHotEncoder::fit(&fields(), &rows());
        let mut out = vec![0.0; encoder.width()];
        let unmatched =
            encoder.encode_into(&FeatureRow::new().with_category("company", "Z"), &mut out);
        assert_eq!(out, vec![0.0; 4]);
        assert_eq!(unmatched, vec!["company", "feature"]);
    }

    #[test]
    fn test_row_order_does_not_change_layout() {
        let mut reversed = rows();
        reversed.reverse();
        assert_eq!(
            OneHotEncoder::fit(&fields(), &rows()),
            OneHotEncoder::fit(&fields(), &reversed)
        );
    }
}

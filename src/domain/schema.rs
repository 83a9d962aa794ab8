// ============================================================
// PRICE SCHEMA
// ============================================================
// Canonical field sets and the header synonym map used at ingestion

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Built-in field layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPreset {
    /// company / product_model / feature -> price
    #[default]
    Catalog,
    /// brand / category + size / base_cost -> price
    Retail,
}

/// The canonical field set a model is trained and queried with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSchema {
    pub preset: SchemaPreset,
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
    pub target: String,
    /// Cleaned header -> canonical name.
    pub synonyms: BTreeMap<String, String>,
}

impl Default for PriceSchema {
    fn default() -> Self {
        Self::catalog()
    }
}

impl PriceSchema {
    pub fn from_preset(preset: SchemaPreset) -> Self {
        match preset {
            SchemaPreset::Catalog => Self::catalog(),
            SchemaPreset::Retail => Self::retail(),
        }
    }

    pub fn catalog() -> Self {
        Self {
            preset: SchemaPreset::Catalog,
            categorical: owned(&["company", "product_model", "feature"]),
            numeric: Vec::new(),
            target: "price".to_string(),
            synonyms: synonym_map(&[
                ("azienda", "company"),
                ("nome azienda", "company"),
                ("brand", "company"),
                ("modello", "product_model"),
                ("modello prodotto", "product_model"),
                ("caratteristica", "feature"),
                ("caratteristiche", "feature"),
                ("variant", "feature"),
                ("prezzo", "price"),
                ("costo", "price"),
                ("price (€)", "price"),
                ("prezzo (€)", "price"),
            ]),
        }
    }

    pub fn retail() -> Self {
        Self {
            preset: SchemaPreset::Retail,
            categorical: owned(&["brand", "category"]),
            numeric: owned(&["size", "base_cost"]),
            target: "price".to_string(),
            synonyms: synonym_map(&[
                ("marca", "brand"),
                ("categoria", "category"),
                ("taglia", "size"),
                ("costo base", "base_cost"),
                ("base cost", "base_cost"),
                ("prezzo", "price"),
                ("price (€)", "price"),
                ("prezzo (€)", "price"),
            ]),
        }
    }

    /// Adds synonyms on top of the preset ones. Keys are cleaned the same way headers are.
    pub fn with_synonyms<'a>(
        mut self,
        extra: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        for (header, canonical) in extra {
            self.synonyms
                .insert(clean_header(header), canonical.trim().to_lowercase());
        }
        self
    }

    /// Categorical fields, then numeric fields, then the target.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns = self.feature_names();
        columns.push(self.target.clone());
        columns
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.categorical
            .iter()
            .chain(self.numeric.iter())
            .cloned()
            .collect()
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|f| f == name)
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|f| f == name)
    }

    /// Maps a raw header (any case, padding or synonym) to its canonical name.
    /// Headers without a synonym entry pass through cleaned but otherwise unchanged.
    pub fn canonical_header(&self, raw: &str) -> String {
        let cleaned = clean_header(raw);
        match self.synonyms.get(&cleaned) {
            Some(canonical) => canonical.clone(),
            None => cleaned,
        }
    }
}

/// Trims, lowercases and collapses inner whitespace runs to a single space.
pub fn clean_header(raw: &str) -> String {
    let lowered = raw.trim().trim_start_matches('\u{feff}').trim().to_lowercase();
    WHITESPACE_RUN.replace_all(&lowered, " ").into_owned()
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn synonym_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_required_columns() {
        let schema = PriceSchema::catalog();
        assert_eq!(
            schema.required_columns(),
            vec!["company", "product_model", "feature", "price"]
        );
    }

    #[test]
    fn test_retail_required_columns() {
        let schema = PriceSchema::retail();
        assert_eq!(
            schema.required_columns(),
            vec!["brand", "category", "size", "base_cost", "price"]
        );
        assert!(schema.is_numeric("size"));
        assert!(schema.is_categorical("brand"));
    }

    #[test]
    fn test_canonical_header_synonyms() {
        let schema = PriceSchema::catalog();
        assert_eq!(schema.canonical_header("  Prezzo "), "price");
        assert_eq!(schema.canonical_header("NOME   Azienda"), "company");
        assert_eq!(schema.canonical_header("Modello Prodotto"), "product_model");
        assert_eq!(schema.canonical_header("Price (€)"), "price");
        assert_eq!(schema.canonical_header("Company"), "company");
    }

    #[test]
    fn test_unknown_header_passes_through() {
        let schema = PriceSchema::catalog();
        assert_eq!(schema.canonical_header(" Notes "), "notes");
    }

    #[test]
    fn test_extra_synonyms_are_cleaned() {
        let extra: BTreeMap<String, String> =
            [("  Hersteller ".to_string(), "Company".to_string())].into();
        let schema = PriceSchema::catalog().with_synonyms(&extra);
        assert_eq!(schema.canonical_header("hersteller"), "company");
    }

    #[test]
    fn test_bom_is_stripped() {
        assert_eq!(clean_header("\u{feff}Company"), "company");
    }
}

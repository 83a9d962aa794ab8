// ============================================================
// SAMPLE DATASETS
// ============================================================
// Downloadable CSV template and built-in demo training sets

use crate::domain::schema::SchemaPreset;

/// Template offered at `/sample.csv` and by `price-app sample`.
pub const SAMPLE_CSV: &str = "\
company,product_model,feature,price
Acme,X100,base,199.99
Acme,X200,pro,249.50
Globex,G1,base,179.00
Globex,G2,max,299.00
Initech,I5,pro,229.90
";

const DEMO_CATALOG_CSV: &str = "\
company,product_model,feature,price
A,M1,base,100
A,M2,pro,130
B,M1,base,110
B,M3,max,160
C,M2,pro,140
C,M3,max,170
";

const DEMO_RETAIL_CSV: &str = "\
brand,category,size,base_cost,price
alpha,shoes,40,20,62
alpha,bag,1,35,82
beta,shoes,42,25,78
beta,bag,2,30,75
gamma,shoes,38,22,69
gamma,bag,1,40,96
alpha,shoes,44,21,66
beta,bag,3,28,73
";

/// Small dataset that trains a usable model for the given preset without an upload.
pub fn demo_csv(preset: SchemaPreset) -> &'static str {
    match preset {
        SchemaPreset::Catalog => DEMO_CATALOG_CSV,
        SchemaPreset::Retail => DEMO_RETAIL_CSV,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::schema_normalizer::SchemaNormalizer;
    use crate::domain::schema::PriceSchema;
    use crate::infrastructure::csv::CsvParser;

    #[test]
    fn test_sample_has_five_rows_and_catalog_header() {
        let raw = CsvParser::new().parse_content(SAMPLE_CSV).unwrap();
        assert_eq!(raw.headers, vec!["company", "product_model", "feature", "price"]);
        assert_eq!(raw.len(), 5);
    }

    #[test]
    fn test_demo_sets_normalize_without_drops() {
        for preset in [SchemaPreset::Catalog, SchemaPreset::Retail] {
            let schema = PriceSchema::from_preset(preset);
            let raw = CsvParser::new().parse_content(demo_csv(preset)).unwrap();
            let (table, report) = SchemaNormalizer::new(&schema).normalize(&raw).unwrap();
            assert_eq!(report.rows_dropped(), 0, "{preset:?}");
            assert_eq!(table.len(), raw.len());
        }
    }
}

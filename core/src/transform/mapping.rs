//! Reference mapping uploads: deposit product mapping and loan product mapping.

use super::{TransformContext, Transformer};
use crate::{
    detector::FileType,
    error::IngestResult,
    normalize::optional_amount,
    parser::RawRow,
    records::{LoanProductMapping, ProductMapping},
    reference::product_code,
    store::Table,
};

/// Y/YES/1/TRUE and N/NO/0/FALSE; anything else leaves the flag unset.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "Y" | "YES" | "1" | "TRUE" => Some(true),
        "N" | "NO" | "0" | "FALSE" => Some(false),
        _ => None,
    }
}

fn row_product_code(row: &RawRow) -> String {
    let explicit = row.get("PRODUCT_CODE").trim();
    if explicit.is_empty() {
        product_code(row.get("ACCT_TYPE"), row.get("INT_CAT"))
    } else {
        explicit.to_string()
    }
}

pub fn transform_product_mappings(rows: &[RawRow]) -> Vec<ProductMapping> {
    rows.iter()
        .filter_map(|row| {
            let code = row_product_code(row);
            if code.is_empty() {
                return None;
            }
            Some(ProductMapping {
                product_code: code,
                category:     row.get("CATEGORY").to_string(),
                sub_category: row.get("SUB_CATEGORY").to_string(),
                prod_type:    row.get("PROD_TYPE").to_string(),
                prod_desc:    row.get("PROD_DESC").to_string(),
                salary:       parse_flag(row.get("SALARY")),
                wealth:       parse_flag(row.get("WEALTH")),
                senior:       parse_flag(row.get("SENIOR")),
                nri:          parse_flag(row.get("NRI")),
            })
        })
        .collect()
}

pub fn transform_loan_product_mappings(rows: &[RawRow]) -> Vec<LoanProductMapping> {
    rows.iter()
        .filter_map(|row| {
            let code = row_product_code(row);
            if code.is_empty() {
                return None;
            }
            Some(LoanProductMapping {
                product_code: code,
                category:     row.get("CATEGORY").to_string(),
                sub_category: row.get("SUB_CATEGORY").to_string(),
                segment:      row.get("SEGMENT").to_string(),
                priority:     row.get("PRIORITY").to_string(),
                secured:      row.get("SECURED").to_string(),
                scheme:       row.get("SCHEME").to_string(),
                risk_weight:  optional_amount(row.get("RISK_WEIGHT")),
            })
        })
        .collect()
}

pub struct ProductMappingTransformer;

impl Transformer for ProductMappingTransformer {
    fn name(&self) -> &'static str {
        "product_mapping"
    }

    fn file_type(&self) -> FileType {
        FileType::ProductMapping
    }

    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize> {
        let mappings = transform_product_mappings(rows);
        ctx.store.replace_all(Table::ProductMapping, &mappings)?;
        Ok(mappings.len())
    }
}

pub struct LoanProductMappingTransformer;

impl Transformer for LoanProductMappingTransformer {
    fn name(&self) -> &'static str {
        "loan_product_mapping"
    }

    fn file_type(&self) -> FileType {
        FileType::LoanProductMapping
    }

    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize> {
        let mappings = transform_loan_product_mappings(rows);
        ctx.store.replace_all(Table::LoanProductMapping, &mappings)?;
        Ok(mappings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_tri_state() {
        assert_eq!(parse_flag("y"), Some(true));
        assert_eq!(parse_flag(" No "), Some(false));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn product_code_falls_back_to_type_and_category() {
        let rows = vec![
            RawRow::from_pairs([("ACCT_TYPE", "SB"), ("INT_CAT", "01"), ("CATEGORY", "Regular Savings")]),
            RawRow::from_pairs([("PRODUCT_CODE", "FD-10"), ("CATEGORY", "Fixed Deposit"), ("WEALTH", "Y")]),
            RawRow::from_pairs([("CATEGORY", "Orphan")]),
        ];
        let mappings = transform_product_mappings(&rows);
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].product_code, "SB-01");
        assert_eq!(mappings[1].product_code, "FD-10");
        assert_eq!(mappings[1].wealth, Some(true));
        assert_eq!(mappings[1].salary, None);
    }
}

//! NPA report transformer.

use super::{TransformContext, Transformer};
use crate::{
    config::PipelineConfig,
    detector::FileType,
    error::IngestResult,
    normalize::{normalize_id, parse_amount, parse_date},
    parser::RawRow,
    records::NpaAccount,
    store::Table,
};

/// Asset class label for an IRAC code, zero-padded or bare.
pub fn irac_description(irac: &str) -> &'static str {
    match normalize_id(irac).as_str() {
        "4" => "Sub-Standard",
        "5" => "Doubtful",
        "6" => "Doubtful-D2",
        "7" => "Doubtful-D3",
        "8" => "Loss",
        _ => "Standard",
    }
}

pub fn transform_npa(rows: &[RawRow], config: &PipelineConfig) -> Vec<NpaAccount> {
    rows.iter()
        .filter(|r| !r.get("ACCOUNT_NO").trim().is_empty())
        .map(|r| {
            let irac = normalize_id(r.get("IRAC"));
            NpaAccount {
                account_no:       normalize_id(r.get("ACCOUNT_NO")),
                cif:              normalize_id(r.get("CIF_NO")),
                customer_name:    r.get("CUSTOMER_NAME").to_string(),
                outstanding:      parse_amount(r.get("OUTSTANDING")),
                npa_date:         parse_date(r.get("NPA_DATE"), &config.date_sentinels),
                irac_description: irac_description(&irac).to_string(),
                irac,
                provision_amount: parse_amount(r.get_any(&["PROVISION", "PROVISION_AMOUNT"])),
            }
        })
        .collect()
}

pub struct NpaTransformer;

impl Transformer for NpaTransformer {
    fn name(&self) -> &'static str {
        "npa"
    }

    fn file_type(&self) -> FileType {
        FileType::NpaReport
    }

    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize> {
        let accounts = transform_npa(rows, ctx.config);
        ctx.store.replace_all(Table::Npa, &accounts)?;
        Ok(accounts.len())
    }
}

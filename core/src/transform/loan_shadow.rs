//! Loan shadow transformer: month-end static loan reference data.
//! No joins: the balance transformer reads this table, not the other way round.

use super::{TransformContext, Transformer};
use crate::{
    config::PipelineConfig,
    detector::FileType,
    error::IngestResult,
    normalize::{normalize_id, optional_amount, parse_amount, parse_date},
    parser::RawRow,
    records::LoanShadowAccount,
    store::Table,
};

pub fn transform_loan_shadow(rows: &[RawRow], config: &PipelineConfig) -> Vec<LoanShadowAccount> {
    let sentinels = &config.date_sentinels;
    rows.iter()
        .filter(|r| !r.get("ACCOUNT_NO").trim().is_empty())
        .map(|r| LoanShadowAccount {
            account_no:     normalize_id(r.get("ACCOUNT_NO")),
            cif:            normalize_id(r.get("CIF_NO")),
            customer_name:  r.get("CUSTOMER_NAME").to_string(),
            acct_type:      r.get("ACCT_TYPE").trim().to_string(),
            int_cat:        r.get("INT_CAT").trim().to_string(),
            sanction_date:  parse_date(r.get("SANCTION_DATE"), sentinels),
            maturity_date:  parse_date(r.get("MATURITY_DATE"), sentinels),
            sanction_limit: parse_amount(r.get("SANCTION_LIMIT")),
            emi_amount:     optional_amount(r.get("EMI_AMOUNT")),
            emi_due:        parse_amount(r.get("EMI_DUE")),
            emi_paid:       parse_amount(r.get("EMI_PAID")),
            emi_overdue:    parse_amount(r.get("EMI_OVERDUE")),
            arrear_amount:  parse_amount(r.get("ARREAR_AMOUNT")),
            irac:           normalize_id(r.get("IRAC")),
            mobile:         r.get("MOBILE").trim().to_string(),
            address:        r.get("ADDRESS").trim().to_string(),
        })
        .collect()
}

pub struct LoanShadowTransformer;

impl Transformer for LoanShadowTransformer {
    fn name(&self) -> &'static str {
        "loan_shadow"
    }

    fn file_type(&self) -> FileType {
        FileType::LoanShadow
    }

    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize> {
        let accounts = transform_loan_shadow(rows, ctx.config);
        ctx.store.replace_all(Table::LoanShadow, &accounts)?;
        Ok(accounts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn normalizes_keys_dates_and_amounts() {
        let rows = vec![
            RawRow::from_pairs([
                ("ACCOUNT_NO", "000451"),
                ("CIF_NO", "0099"),
                ("SANCTION_DATE", "15/06/2020"),
                ("MATURITY_DATE", "00/00/0000"),
                ("EMI_AMOUNT", "12,500"),
                ("EMI_OVERDUE", "bad"),
                ("IRAC", "04"),
            ]),
            RawRow::from_pairs([("ACCOUNT_NO", "  "), ("CIF_NO", "1")]),
        ];
        let out = transform_loan_shadow(&rows, &PipelineConfig::default());
        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!(s.account_no, "451");
        assert_eq!(s.cif, "99");
        assert_eq!(s.sanction_date, NaiveDate::from_ymd_opt(2020, 6, 15));
        assert_eq!(s.maturity_date, None);
        assert_eq!(s.emi_amount, Some(12_500.0));
        assert_eq!(s.emi_overdue, 0.0);
        assert_eq!(s.irac, "4");
    }
}

//! CC/OD transformer: cash credit and overdraft limits against drawing power.

use super::{TransformContext, Transformer};
use crate::{
    detector::FileType,
    error::IngestResult,
    normalize::{normalize_id, parse_amount, round4},
    parser::RawRow,
    records::CcodAccount,
    store::Table,
};

/// Irregular amount first, then balance beyond a positive drawing power.
pub fn irregular_flag(balance: f64, drawing_power: f64, irregular_amount: f64) -> &'static str {
    if irregular_amount > 0.0 {
        "Irregular"
    } else if drawing_power > 0.0 && balance.abs() > drawing_power {
        "Overdrawn"
    } else {
        "Regular"
    }
}

pub fn transform_ccod(rows: &[RawRow]) -> Vec<CcodAccount> {
    rows.iter()
        .filter(|r| !r.get("ACCOUNT_NO").trim().is_empty())
        .map(|r| {
            let balance = parse_amount(r.get("BALANCE"));
            let sanction_limit = parse_amount(r.get("SANCTION_LIMIT"));
            let drawing_power = parse_amount(r.get("DRAWING_POWER"));
            let irregular_amount = parse_amount(r.get("IRREGULAR_AMOUNT"));
            let utilization = if sanction_limit == 0.0 {
                None
            } else {
                Some(round4(balance / sanction_limit))
            };

            CcodAccount {
                account_no: normalize_id(r.get("ACCOUNT_NO")),
                cif: normalize_id(r.get("CIF_NO")),
                customer_name: r.get("CUSTOMER_NAME").to_string(),
                acct_desc: r.get("ACCT_DESC").trim().to_string(),
                balance,
                sanction_limit,
                drawing_power,
                irregular_amount,
                interest_rate: parse_amount(r.get("INTEREST_RATE")),
                sma_class: r.get("SMA_CLASS").trim().to_string(),
                irac: normalize_id(r.get("IRAC")),
                utilization,
                dp_gap: drawing_power - balance,
                irregular_flag: irregular_flag(balance, drawing_power, irregular_amount).to_string(),
            }
        })
        .collect()
}

pub struct CcodTransformer;

impl Transformer for CcodTransformer {
    fn name(&self) -> &'static str {
        "ccod"
    }

    fn file_type(&self) -> FileType {
        FileType::CcodBalance
    }

    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize> {
        let accounts = transform_ccod(rows);
        let irregular = accounts
            .iter()
            .filter(|a| a.irregular_flag != "Regular")
            .count();
        log::debug!("ccod: {irregular} irregular or overdrawn accounts");
        ctx.store.replace_all(Table::Ccod, &accounts)?;
        Ok(accounts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irregular_flag_priority() {
        assert_eq!(irregular_flag(-900.0, 500.0, 10.0), "Irregular");
        assert_eq!(irregular_flag(-900.0, 500.0, 0.0), "Overdrawn");
        assert_eq!(irregular_flag(-400.0, 500.0, 0.0), "Regular");
        // No drawing power set: never overdrawn.
        assert_eq!(irregular_flag(-400.0, 0.0, 0.0), "Regular");
    }

    #[test]
    fn derives_utilization_and_dp_gap() {
        let rows = vec![
            RawRow::from_pairs([
                ("ACCOUNT_NO", "0000321"),
                ("CIF_NO", "08"),
                ("BALANCE", "250000"),
                ("SANCTION_LIMIT", "1,000,000"),
                ("DRAWING_POWER", "800000"),
            ]),
            RawRow::from_pairs([("ACCOUNT_NO", "400"), ("BALANCE", "10")]),
            RawRow::from_pairs([("ACCOUNT_NO", ""), ("BALANCE", "10")]),
        ];
        let out = transform_ccod(&rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].account_no, "321");
        assert_eq!(out[0].utilization, Some(0.25));
        assert_eq!(out[0].dp_gap, 550_000.0);
        assert_eq!(out[0].irregular_flag, "Regular");
        assert_eq!(out[1].utilization, None);
    }
}

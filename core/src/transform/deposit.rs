//! Deposit transformer. Classifies the deposit shadow extract.
//!
//! Order of work:
//!   1. Classify every row (product, flags, value band, maturity, dormancy).
//!   2. Drop rows whose account already lives in the CC/OD table.
//!   3. Pass 1: sum current balance per CIF over the surviving rows.
//!   4. Pass 2: stamp HNI category and CIF total on every surviving row.
//!
//! The two CIF passes stay separate so the result never depends on row order.

use super::{TransformContext, Transformer};
use crate::{
    config::{DepositConfig, FlagRule, HniThresholds, PipelineConfig, ValueBandThresholds},
    dedup::overlapping_accounts,
    detector::FileType,
    error::IngestResult,
    normalize::{contains_keyword, days_until, normalize_id, parse_amount, parse_date},
    parser::RawRow,
    records::{DepositAccount, DepositShadowRow},
    reference::{product_code, ReferenceTables},
    store::{Table, TableSnapshot},
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

const UNKNOWN: &str = "Unknown";

pub fn hni_category(total: f64, thresholds: &HniThresholds) -> &'static str {
    if total >= thresholds.ultra_hni {
        "Ultra HNI"
    } else if total >= thresholds.hni {
        "HNI"
    } else {
        "Regular"
    }
}

pub fn value_band(balance: f64, bands: &ValueBandThresholds) -> &'static str {
    if balance >= bands.very_high {
        "Very High"
    } else if balance >= bands.high {
        "High"
    } else if balance >= bands.medium {
        "Medium"
    } else {
        "Low"
    }
}

pub fn maturity_bucket(days: i64) -> &'static str {
    match days {
        d if d <= 0 => "Matured",
        d if d <= 30 => "0-30 Days",
        d if d <= 90 => "31-90 Days",
        d if d <= 180 => "91-180 Days",
        d if d <= 365 => "181-365 Days",
        _ => "365+ Days",
    }
}

/// First match wins: frozen, zero balance, closed, dormant status, active.
pub fn dormancy_flag(
    frozen_amount: f64,
    current_balance: f64,
    available_balance: f64,
    close_date: Option<NaiveDate>,
    status_code: &str,
    config: &DepositConfig,
) -> &'static str {
    if frozen_amount > 0.0 {
        "Frozen"
    } else if current_balance == 0.0 && available_balance == 0.0 {
        "Zero Balance"
    } else if close_date.is_some() {
        "Closed"
    } else if config
        .dormant_status_codes
        .iter()
        .any(|c| normalize_id(c) == normalize_id(status_code))
    {
        "Dormant/Inoperative"
    } else {
        "Active"
    }
}

/// Explicit mapping flag, then product-type code, then description keyword.
pub fn resolve_flag(explicit: Option<bool>, rule: &FlagRule, prod_type: &str, desc: &str) -> bool {
    if let Some(v) = explicit {
        return v;
    }
    let prod_type = prod_type.trim();
    if rule.type_codes.iter().any(|c| c.eq_ignore_ascii_case(prod_type)) {
        return true;
    }
    let desc = desc.to_ascii_uppercase();
    rule.keywords.iter().any(|k| contains_keyword(&desc, k))
}

fn or_unknown(s: &str) -> String {
    if s.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        s.to_string()
    }
}

/// Classify one row. HNI fields are filled later by the CIF passes.
fn classify_row(
    row: &RawRow,
    refs: &ReferenceTables,
    config: &PipelineConfig,
    today: NaiveDate,
) -> DepositAccount {
    let sentinels = &config.date_sentinels;
    let dep = &config.deposit;

    let code = product_code(row.get("ACCT_TYPE"), row.get("INT_CAT"));
    let mapping = refs.deposit_product(&code);

    let category = or_unknown(mapping.map(|m| m.category.as_str()).unwrap_or(""));
    let sub_category = or_unknown(mapping.map(|m| m.sub_category.as_str()).unwrap_or(""));
    let prod_type = or_unknown(mapping.map(|m| m.prod_type.as_str()).unwrap_or(""));
    let prod_desc = match mapping.map(|m| m.prod_desc.as_str()) {
        Some(d) if !d.trim().is_empty() => d.to_string(),
        _ => or_unknown(row.get("PROD_DESC")),
    };

    let flag = |explicit: Option<bool>, rule: &FlagRule| {
        resolve_flag(explicit, rule, &prod_type, &prod_desc)
    };
    let is_salary = flag(mapping.and_then(|m| m.salary), &dep.flags.salary);
    let is_wealth = flag(mapping.and_then(|m| m.wealth), &dep.flags.wealth);
    let is_senior = flag(mapping.and_then(|m| m.senior), &dep.flags.senior);
    let is_nri = flag(mapping.and_then(|m| m.nri), &dep.flags.nri);

    let current_balance = parse_amount(row.get("CURRENT_BALANCE"));
    let available_balance = parse_amount(row.get("AVAILABLE_BALANCE"));
    let frozen_amount = parse_amount(row.get("FROZEN_AMOUNT"));
    let close_date = parse_date(row.get("CLOSE_DATE"), sentinels);
    let maturity_date = parse_date(row.get("MATURITY_DATE"), sentinels);
    let status_code = row.get("ACCT_STATUS").trim().to_string();

    let deposit_value_band = dep
        .casa_categories
        .contains(&category)
        .then(|| value_band(current_balance, &dep.value_bands).to_string());

    let is_term = dep.term_categories.contains(&category);
    let days_to_maturity = if is_term {
        days_until(maturity_date, today)
    } else {
        None
    };
    let maturity_bucket = days_to_maturity.map(|d| maturity_bucket(d).to_string());

    let dormancy = dormancy_flag(
        frozen_amount,
        current_balance,
        available_balance,
        close_date,
        &status_code,
        dep,
    );

    DepositAccount {
        account_no: normalize_id(row.get("ACCOUNT_NO")),
        cif: normalize_id(row.get("CIF_NO")),
        customer_name: row.get("CUSTOMER_NAME").to_string(),
        product_code: code,
        category,
        sub_category,
        prod_type,
        prod_desc,
        current_balance,
        available_balance,
        frozen_amount,
        interest_rate: parse_amount(row.get("INTEREST_RATE")),
        open_date: parse_date(row.get("OPEN_DATE"), sentinels),
        close_date,
        maturity_date,
        maturity_amount: parse_amount(row.get("MATURITY_AMOUNT")),
        status_code,
        is_salary,
        is_wealth,
        is_senior,
        is_nri,
        dormancy_flag: dormancy.to_string(),
        deposit_value_band,
        maturity_bucket,
        days_to_maturity,
        hni_category: String::new(),
        cif_total_deposit: 0.0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct DepositOutput {
    /// Surviving, fully classified deposit accounts.
    pub accounts:    Vec<DepositAccount>,
    /// Every parsed row, including those routed to CC/OD.
    pub shadow_rows: Vec<DepositShadowRow>,
    pub unresolved:  usize,
}

/// Classify, deduplicate against `ccod_accounts`, then run the two CIF passes.
pub fn transform_deposits(
    rows: &[RawRow],
    refs: &ReferenceTables,
    ccod_accounts: &[String],
    config: &PipelineConfig,
    today: NaiveDate,
) -> DepositOutput {
    let classified: Vec<(DepositAccount, &RawRow)> = rows
        .iter()
        .filter(|r| !r.get("ACCOUNT_NO").trim().is_empty())
        .map(|r| (classify_row(r, refs, config, today), r))
        .collect();

    let overlap = overlapping_accounts(
        classified.iter().map(|(a, _)| a.account_no.as_str()),
        ccod_accounts.iter().map(String::as_str),
    );

    let shadow_rows = classified
        .iter()
        .map(|(a, raw)| DepositShadowRow {
            account_no:     a.account_no.clone(),
            cif:            a.cif.clone(),
            routed_to_ccod: overlap.contains(&a.account_no),
            columns:        raw
                .fields()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect();

    // One record per account: a later line for the same normalized account
    // replaces the earlier one in place.
    let mut survivors: Vec<DepositAccount> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for (a, _) in classified {
        if overlap.contains(&a.account_no) {
            continue;
        }
        match position.get(&a.account_no) {
            Some(&i) => survivors[i] = a,
            None => {
                position.insert(a.account_no.clone(), survivors.len());
                survivors.push(a);
            }
        }
    }

    // Pass 1: per-CIF totals.
    let mut cif_totals: HashMap<String, f64> = HashMap::new();
    for a in survivors.iter().filter(|a| !a.cif.is_empty()) {
        *cif_totals.entry(a.cif.clone()).or_insert(0.0) += a.current_balance;
    }

    // Pass 2: enrichment.
    for a in &mut survivors {
        let total = cif_totals
            .get(&a.cif)
            .copied()
            .unwrap_or(a.current_balance);
        a.cif_total_deposit = total;
        a.hni_category = hni_category(total, &config.hni).to_string();
    }

    let unresolved = survivors.iter().filter(|a| a.category == UNKNOWN).count();
    if !overlap.is_empty() {
        log::warn!(
            "deposit: {} accounts already present in CC/OD, excluded",
            overlap.len()
        );
    }

    DepositOutput {
        accounts: survivors,
        shadow_rows,
        unresolved,
    }
}

pub struct DepositTransformer;

impl Transformer for DepositTransformer {
    fn name(&self) -> &'static str {
        "deposit"
    }

    fn file_type(&self) -> FileType {
        FileType::DepositShadow
    }

    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize> {
        let refs = ReferenceTables::load(ctx.store)?;
        let ccod_accounts = ctx.store.keys(Table::Ccod)?;

        let out = transform_deposits(rows, &refs, &ccod_accounts, ctx.config, ctx.today);
        if out.unresolved > 0 {
            log::warn!(
                "deposit: {} accounts have no product mapping (category Unknown)",
                out.unresolved
            );
        }

        ctx.store.replace_tables(&[
            TableSnapshot::of(Table::Deposit, &out.accounts)?,
            TableSnapshot::of(Table::DepositShadow, &out.shadow_rows)?,
        ])?;
        Ok(out.accounts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ProductMapping;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    fn refs() -> ReferenceTables {
        let mut refs = ReferenceTables::default();
        for (code, category, prod_type, desc, wealth) in [
            ("SB-01", "Regular Savings", "SB", "SAVINGS BANK GENERAL", None),
            ("SB-05", "Salary Savings", "SAL", "SALARY PACKAGE", None),
            ("FD-10", "Fixed Deposit", "TD", "WEALTH PLUS TERM DEPOSIT", Some(false)),
        ] {
            refs.deposit.insert(
                code.into(),
                ProductMapping {
                    product_code: code.into(),
                    category:     category.into(),
                    sub_category: String::new(),
                    prod_type:    prod_type.into(),
                    prod_desc:    desc.into(),
                    salary:       None,
                    wealth,
                    senior:       None,
                    nri:          None,
                },
            );
        }
        refs
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn hni_thresholds_are_inclusive() {
        let t = PipelineConfig::default().hni;
        assert_eq!(hni_category(2_500_000.0, &t), "HNI");
        assert_eq!(hni_category(2_499_999.99, &t), "Regular");
        assert_eq!(hni_category(10_000_000.0, &t), "Ultra HNI");
    }

    #[test]
    fn maturity_buckets_cover_boundaries() {
        assert_eq!(maturity_bucket(-5), "Matured");
        assert_eq!(maturity_bucket(0), "Matured");
        assert_eq!(maturity_bucket(30), "0-30 Days");
        assert_eq!(maturity_bucket(31), "31-90 Days");
        assert_eq!(maturity_bucket(365), "181-365 Days");
        assert_eq!(maturity_bucket(366), "365+ Days");
    }

    #[test]
    fn dormancy_priority_is_first_match() {
        let cfg = PipelineConfig::default().deposit;
        let closed = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(dormancy_flag(10.0, 0.0, 0.0, closed, "08", &cfg), "Frozen");
        assert_eq!(dormancy_flag(0.0, 0.0, 0.0, closed, "08", &cfg), "Zero Balance");
        assert_eq!(dormancy_flag(0.0, 5.0, 0.0, closed, "08", &cfg), "Closed");
        assert_eq!(dormancy_flag(0.0, 5.0, 5.0, None, "08", &cfg), "Dormant/Inoperative");
        assert_eq!(dormancy_flag(0.0, 5.0, 5.0, None, "01", &cfg), "Active");
    }

    #[test]
    fn explicit_flag_beats_type_code_and_keyword() {
        let rule = PipelineConfig::default().deposit.flags.wealth;
        assert!(!resolve_flag(Some(false), &rule, "WLT", "WEALTH"));
        assert!(resolve_flag(None, &rule, "WLT", "PLAIN"));
        assert!(resolve_flag(None, &rule, "TD", "wealth plus"));
        assert!(!resolve_flag(None, &rule, "TD", "PLAIN"));
    }

    #[test]
    fn value_band_only_for_casa_and_maturity_only_for_term() {
        let cfg = PipelineConfig::default();
        let rows = vec![
            row(&[
                ("ACCOUNT_NO", "001"),
                ("CIF_NO", "9"),
                ("ACCT_TYPE", "SB"),
                ("INT_CAT", "01"),
                ("CURRENT_BALANCE", "60,000"),
                ("AVAILABLE_BALANCE", "60000"),
                ("MATURITY_DATE", "30/04/2024"),
            ]),
            row(&[
                ("ACCOUNT_NO", "002"),
                ("CIF_NO", "9"),
                ("ACCT_TYPE", "FD"),
                ("INT_CAT", "10"),
                ("CURRENT_BALANCE", "500000"),
                ("AVAILABLE_BALANCE", "500000"),
                ("MATURITY_DATE", "30/04/2024"),
            ]),
        ];
        let out = transform_deposits(&rows, &refs(), &[], &cfg, today());
        let sb = &out.accounts[0];
        assert_eq!(sb.deposit_value_band.as_deref(), Some("Medium"));
        assert_eq!(sb.maturity_bucket, None);

        let fd = &out.accounts[1];
        assert_eq!(fd.deposit_value_band, None);
        assert_eq!(fd.days_to_maturity, Some(30));
        assert_eq!(fd.maturity_bucket.as_deref(), Some("0-30 Days"));
        // Mapping says wealth = N even though the description mentions WEALTH.
        assert!(!fd.is_wealth);

        // Both rows share CIF 9.
        assert_eq!(sb.cif_total_deposit, 560_000.0);
        assert_eq!(fd.cif_total_deposit, 560_000.0);
    }

    #[test]
    fn unmapped_products_are_unknown_and_keyword_flags_still_apply() {
        let cfg = PipelineConfig::default();
        let rows = vec![row(&[
            ("ACCOUNT_NO", "77"),
            ("CIF_NO", "5"),
            ("ACCT_TYPE", "XX"),
            ("INT_CAT", "99"),
            ("PROD_DESC", "NRE SAVINGS"),
            ("CURRENT_BALANCE", "10"),
        ])];
        let out = transform_deposits(&rows, &refs(), &[], &cfg, today());
        let a = &out.accounts[0];
        assert_eq!(a.category, "Unknown");
        assert_eq!(a.sub_category, "Unknown");
        assert_eq!(a.prod_type, "Unknown");
        assert_eq!(a.prod_desc, "NRE SAVINGS");
        assert!(a.is_nri);
        assert_eq!(out.unresolved, 1);
    }

    #[test]
    fn ccod_accounts_are_excluded_before_cif_totals() {
        let cfg = PipelineConfig::default();
        let rows = vec![
            row(&[("ACCOUNT_NO", "0100"), ("CIF_NO", "7"), ("CURRENT_BALANCE", "2000000")]),
            row(&[("ACCOUNT_NO", "0200"), ("CIF_NO", "7"), ("CURRENT_BALANCE", "1000000")]),
        ];
        let ccod = vec!["200".to_string()];
        let out = transform_deposits(&rows, &refs(), &ccod, &cfg, today());

        assert_eq!(out.accounts.len(), 1);
        assert_eq!(out.accounts[0].account_no, "100");
        // Without the CC/OD twin the CIF stays under the HNI line.
        assert_eq!(out.accounts[0].cif_total_deposit, 2_000_000.0);
        assert_eq!(out.accounts[0].hni_category, "Regular");

        assert_eq!(out.shadow_rows.len(), 2);
        assert!(out.shadow_rows.iter().any(|s| s.account_no == "200" && s.routed_to_ccod));
    }

    #[test]
    fn repeated_account_keeps_last_line_only() {
        let cfg = PipelineConfig::default();
        let rows = vec![
            row(&[("ACCOUNT_NO", "001"), ("CIF_NO", "4"), ("CURRENT_BALANCE", "100")]),
            row(&[("ACCOUNT_NO", "2"), ("CIF_NO", "4"), ("CURRENT_BALANCE", "50")]),
            row(&[("ACCOUNT_NO", "1"), ("CIF_NO", "4"), ("CURRENT_BALANCE", "200")]),
        ];
        let out = transform_deposits(&rows, &refs(), &[], &cfg, today());

        assert_eq!(out.accounts.len(), 2);
        assert_eq!(out.accounts[0].account_no, "1");
        assert_eq!(out.accounts[0].current_balance, 200.0);
        assert!(out.accounts.iter().all(|a| a.cif_total_deposit == 250.0));
    }
}

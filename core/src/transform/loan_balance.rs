//! Loan balance transformer. Daily balances merged with the month-end shadow.
//!
//! Join key is the normalized account number. A balance row without a
//! shadow twin still produces a LoanAccount: shadow fields fall back to
//! 0 / "" / None and classification falls back to description keywords.

use super::{TransformContext, Transformer};
use crate::{
    config::PipelineConfig,
    detector::FileType,
    error::IngestResult,
    normalize::{contains_keyword, month_diff, normalize_id, optional_amount, parse_amount, round4},
    parser::RawRow,
    records::{LoanAccount, LoanShadowAccount},
    reference::{product_code, ReferenceTables},
    store::Table,
};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Checked in order; the first category with a matching keyword wins.
const KEYWORD_CATEGORIES: &[(&str, &[&str])] = &[
    ("Home Loan", &["HOME", "HOUSING"]),
    ("Vehicle Loan", &["VEHICLE", "CAR", "AUTO"]),
    ("Personal Loan", &["PERSONAL"]),
    ("Education Loan", &["EDUCATION", "EDU"]),
    ("Gold Loan", &["GOLD"]),
    ("Agriculture Loan", &["AGRI", "KCC", "KISAN", "CROP"]),
    ("MSME Loan", &["MSME", "BUSINESS", "SME", "MUDRA"]),
    ("CC/OD", &["CC", "OD", "CASH CREDIT", "OVERDRAFT"]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct LoanClassification {
    pub product_code:        String,
    pub category:            String,
    pub sub_category:        String,
    pub segment:             String,
    pub priority:            String,
    pub secured:             String,
    pub scheme:              String,
    pub product_risk_weight: Option<f64>,
    pub source:              &'static str,
}

pub fn keyword_category(acct_desc: &str) -> &'static str {
    let desc = acct_desc.to_ascii_uppercase();
    KEYWORD_CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_keyword(&desc, k)))
        .map(|(category, _)| *category)
        .unwrap_or("Other")
}

fn keyword_classification(code: String, acct_desc: &str) -> LoanClassification {
    let category = keyword_category(acct_desc);
    let segment = match category {
        "Agriculture Loan" => "Agriculture",
        "MSME Loan" => "MSME",
        _ => "Retail",
    };
    let priority = if segment == "Retail" { "Non-Priority" } else { "Priority" };
    LoanClassification {
        product_code:        code,
        category:            category.into(),
        sub_category:        "Unmapped".into(),
        segment:             segment.into(),
        priority:            priority.into(),
        secured:             "Unknown".into(),
        scheme:              "Unknown".into(),
        product_risk_weight: None,
        source:              "keyword",
    }
}

pub fn classify_loan(
    shadow: Option<&LoanShadowAccount>,
    acct_desc: &str,
    segment_code: &str,
    refs: &ReferenceTables,
    config: &PipelineConfig,
) -> LoanClassification {
    let code = shadow
        .map(|s| product_code(&s.acct_type, &s.int_cat))
        .unwrap_or_default();

    let mut c = match refs.loan_product(&code) {
        Some(m) => LoanClassification {
            product_code:        code.clone(),
            category:            m.category.clone(),
            sub_category:        m.sub_category.clone(),
            segment:             m.segment.clone(),
            priority:            m.priority.clone(),
            secured:             m.secured.clone(),
            scheme:              m.scheme.clone(),
            product_risk_weight: m.risk_weight,
            source:              "mapping",
        },
        None => keyword_classification(code, acct_desc),
    };

    let segment_code = segment_code.trim();
    if !segment_code.is_empty()
        && config
            .loan
            .staff_segment_codes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(segment_code))
    {
        c.category = "Staff Loan".into();
        c.segment = "Staff".into();
        c.priority = "High".into();
        c.source = "staff_override";
    }
    c
}

/// SMA class first, then IRAC, then the standard-asset default.
pub fn risk_weight(sma_class: &str, irac: &str) -> f64 {
    let sma: String = sma_class
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase();
    match sma.as_str() {
        "STD" => return 0.95,
        "SMA0" => return 0.85,
        "SMA1" => return 0.65,
        "SMA2" => return 0.35,
        _ => {}
    }
    match normalize_id(irac).as_str() {
        "4" => 0.10,
        "5" | "6" | "7" | "8" => 0.05,
        _ => 0.95,
    }
}

pub fn forecast_bucket(months_to_maturity: i32) -> &'static str {
    match months_to_maturity {
        m if m <= 1 => "0-1 Months",
        m if m <= 3 => "1-3 Months",
        m if m <= 6 => "3-6 Months",
        m if m <= 12 => "6-12 Months",
        _ => "12+ Months",
    }
}

/// `part / term`, None when the term is unknown or zero.
fn tenure_ratio(part: Option<i32>, term: Option<i32>) -> Option<f64> {
    match (part, term) {
        (Some(p), Some(t)) if t != 0 => Some(round4(p as f64 / t as f64)),
        _ => None,
    }
}

pub fn transform_loans(
    rows: &[RawRow],
    shadows: &HashMap<String, LoanShadowAccount>,
    refs: &ReferenceTables,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Vec<LoanAccount> {
    rows.iter()
        .filter(|r| !r.get("ACCOUNT_NO").trim().is_empty())
        .map(|r| {
            let account_no = normalize_id(r.get("ACCOUNT_NO"));
            let shadow = shadows.get(&account_no);
            let acct_desc = r.get("ACCT_DESC").trim().to_string();
            let segment_code = r.get("SEGMENT_CODE").trim().to_string();
            let class = classify_loan(shadow, &acct_desc, &segment_code, refs, config);

            let cif = match shadow {
                Some(s) if !s.cif.is_empty() && s.cif != "0" => s.cif.clone(),
                _ => normalize_id(r.get("CIF_NO")),
            };
            let customer_name = match r.get("CUSTOMER_NAME").trim() {
                "" => shadow.map(|s| s.customer_name.clone()).unwrap_or_default(),
                name => name.to_string(),
            };

            let sanction = shadow.and_then(|s| s.sanction_date);
            let maturity = shadow.and_then(|s| s.maturity_date);
            let months_to_maturity = month_diff(Some(today), maturity);
            let loan_age_months = month_diff(sanction, Some(today));
            let total_loan_term_months = month_diff(sanction, maturity);

            let outstanding = parse_amount(r.get("OUTSTANDING"));
            let interest_rate = optional_amount(r.get("INTEREST_RATE"));
            let installment_amount = optional_amount(r.get("INSTALLMENT_AMOUNT"))
                .or_else(|| shadow.and_then(|s| s.emi_amount));
            let monthly_interest_component = optional_amount(r.get("OUTSTANDING"))
                .zip(interest_rate)
                .map(|(o, rate)| o * rate / 1200.0);
            let monthly_principal_component = installment_amount
                .zip(monthly_interest_component)
                .map(|(i, interest)| i - interest);

            let sma_class = r.get("SMA_CLASS").trim().to_string();
            let irac = match normalize_id(r.get("IRAC")) {
                i if i.is_empty() => shadow.map(|s| s.irac.clone()).unwrap_or_default(),
                i => i,
            };

            LoanAccount {
                account_no,
                cif,
                customer_name,
                acct_desc,
                outstanding,
                interest_rate,
                installment_amount,
                risk_weight: risk_weight(&sma_class, &irac),
                sma_class,
                irac,
                segment_code,

                shadow_found:          shadow.is_some(),
                shadow_sanction_date:  sanction,
                shadow_maturity_date:  maturity,
                shadow_sanction_limit: shadow.map_or(0.0, |s| s.sanction_limit),
                shadow_emi_due:        shadow.map_or(0.0, |s| s.emi_due),
                shadow_emi_paid:       shadow.map_or(0.0, |s| s.emi_paid),
                shadow_emi_overdue:    shadow.map_or(0.0, |s| s.emi_overdue),
                shadow_arrear_amount:  shadow.map_or(0.0, |s| s.arrear_amount),
                shadow_irac:           shadow.map(|s| s.irac.clone()).unwrap_or_default(),
                shadow_mobile:         shadow.map(|s| s.mobile.clone()).unwrap_or_default(),
                shadow_address:        shadow.map(|s| s.address.clone()).unwrap_or_default(),

                product_code:          class.product_code,
                category:              class.category,
                sub_category:          class.sub_category,
                segment:               class.segment,
                priority:              class.priority,
                secured:               class.secured,
                scheme:                class.scheme,
                product_risk_weight:   class.product_risk_weight,
                classification_source: class.source.to_string(),

                months_to_maturity,
                loan_age_months,
                total_loan_term_months,
                remaining_tenure_percent: tenure_ratio(months_to_maturity, total_loan_term_months),
                seasoning_ratio: tenure_ratio(loan_age_months, total_loan_term_months),
                monthly_interest_component,
                monthly_principal_component,
                forecast_bucket: months_to_maturity.map(|m| forecast_bucket(m).to_string()),
            }
        })
        .collect()
}

pub struct LoanBalanceTransformer;

impl Transformer for LoanBalanceTransformer {
    fn name(&self) -> &'static str {
        "loan_balance"
    }

    fn file_type(&self) -> FileType {
        FileType::LoanBalance
    }

    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize> {
        let refs = ReferenceTables::load(ctx.store)?;
        let shadows: HashMap<String, LoanShadowAccount> = ctx
            .store
            .get_all::<LoanShadowAccount>(Table::LoanShadow)?
            .into_iter()
            .map(|s| (s.account_no.clone(), s))
            .collect();

        let loans = transform_loans(rows, &shadows, &refs, ctx.config, ctx.today);
        let unmatched = loans.iter().filter(|l| !l.shadow_found).count();
        if unmatched > 0 {
            log::warn!(
                "loan_balance: {unmatched} of {} accounts have no shadow record",
                loans.len()
            );
        }

        ctx.store.replace_all(Table::Loan, &loans)?;
        Ok(loans.len())
    }
}

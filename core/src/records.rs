//! Persisted record types for every table.
//!
//! Each record is stored as a JSON payload under its primary key.
//! Records that belong to a customer also expose their CIF, which the
//! store writes into an indexed column for get_by_index lookups.

use crate::types::{AccountNo, Cif, ProductCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything the store can persist.
pub trait Keyed {
    fn key(&self) -> &str;

    fn cif(&self) -> Option<&str> {
        None
    }
}

// ── Reference mappings ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMapping {
    pub product_code: ProductCode,
    pub category:     String,
    pub sub_category: String,
    pub prod_type:    String,
    pub prod_desc:    String,
    pub salary:       Option<bool>,
    pub wealth:       Option<bool>,
    pub senior:       Option<bool>,
    pub nri:          Option<bool>,
}

impl Keyed for ProductMapping {
    fn key(&self) -> &str {
        &self.product_code
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProductMapping {
    pub product_code: ProductCode,
    pub category:     String,
    pub sub_category: String,
    pub segment:      String,
    pub priority:     String,
    pub secured:      String,
    pub scheme:       String,
    pub risk_weight:  Option<f64>,
}

impl Keyed for LoanProductMapping {
    fn key(&self) -> &str {
        &self.product_code
    }
}

// ── Deposits ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositAccount {
    pub account_no:         AccountNo,
    pub cif:                Cif,
    pub customer_name:      String,
    pub product_code:       ProductCode,
    pub category:           String,
    pub sub_category:       String,
    pub prod_type:          String,
    pub prod_desc:          String,
    pub current_balance:    f64,
    pub available_balance:  f64,
    pub frozen_amount:      f64,
    pub interest_rate:      f64,
    pub open_date:          Option<NaiveDate>,
    pub close_date:         Option<NaiveDate>,
    pub maturity_date:      Option<NaiveDate>,
    pub maturity_amount:    f64,
    pub status_code:        String,
    pub is_salary:          bool,
    pub is_wealth:          bool,
    pub is_senior:          bool,
    pub is_nri:             bool,
    pub dormancy_flag:      String,
    pub deposit_value_band: Option<String>,
    pub maturity_bucket:    Option<String>,
    pub days_to_maturity:   Option<i64>,
    pub hni_category:       String,
    pub cif_total_deposit:  f64,
}

impl Keyed for DepositAccount {
    fn key(&self) -> &str {
        &self.account_no
    }

    fn cif(&self) -> Option<&str> {
        Some(&self.cif)
    }
}

/// The deposit extract row as received, kept for audit of the dedup decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositShadowRow {
    pub account_no:     AccountNo,
    pub cif:            Cif,
    pub routed_to_ccod: bool,
    pub columns:        BTreeMap<String, String>,
}

impl Keyed for DepositShadowRow {
    fn key(&self) -> &str {
        &self.account_no
    }

    fn cif(&self) -> Option<&str> {
        Some(&self.cif)
    }
}

// ── Loans ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanShadowAccount {
    pub account_no:     AccountNo,
    pub cif:            Cif,
    pub customer_name:  String,
    pub acct_type:      String,
    pub int_cat:        String,
    pub sanction_date:  Option<NaiveDate>,
    pub maturity_date:  Option<NaiveDate>,
    pub sanction_limit: f64,
    pub emi_amount:     Option<f64>,
    pub emi_due:        f64,
    pub emi_paid:       f64,
    pub emi_overdue:    f64,
    pub arrear_amount:  f64,
    pub irac:           String,
    pub mobile:         String,
    pub address:        String,
}

impl Keyed for LoanShadowAccount {
    fn key(&self) -> &str {
        &self.account_no
    }

    fn cif(&self) -> Option<&str> {
        Some(&self.cif)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanAccount {
    pub account_no:         AccountNo,
    pub cif:                Cif,
    pub customer_name:      String,
    pub acct_desc:          String,
    pub outstanding:        f64,
    pub interest_rate:      Option<f64>,
    pub installment_amount: Option<f64>,
    pub sma_class:          String,
    pub irac:               String,
    pub segment_code:       String,

    pub shadow_found:          bool,
    pub shadow_sanction_date:  Option<NaiveDate>,
    pub shadow_maturity_date:  Option<NaiveDate>,
    pub shadow_sanction_limit: f64,
    pub shadow_emi_due:        f64,
    pub shadow_emi_paid:       f64,
    pub shadow_emi_overdue:    f64,
    pub shadow_arrear_amount:  f64,
    pub shadow_irac:           String,
    pub shadow_mobile:         String,
    pub shadow_address:        String,

    pub product_code:          ProductCode,
    pub category:              String,
    pub sub_category:          String,
    pub segment:               String,
    pub priority:              String,
    pub secured:               String,
    pub scheme:                String,
    pub product_risk_weight:   Option<f64>,
    pub classification_source: String, // mapping | keyword | staff_override

    pub months_to_maturity:          Option<i32>,
    pub loan_age_months:             Option<i32>,
    pub total_loan_term_months:      Option<i32>,
    pub remaining_tenure_percent:    Option<f64>,
    pub seasoning_ratio:             Option<f64>,
    pub monthly_interest_component:  Option<f64>,
    pub monthly_principal_component: Option<f64>,
    pub risk_weight:                 f64,
    pub forecast_bucket:             Option<String>,
}

impl Keyed for LoanAccount {
    fn key(&self) -> &str {
        &self.account_no
    }

    fn cif(&self) -> Option<&str> {
        Some(&self.cif)
    }
}

// ── CC/OD ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcodAccount {
    pub account_no:       AccountNo,
    pub cif:              Cif,
    pub customer_name:    String,
    pub acct_desc:        String,
    pub balance:          f64,
    pub sanction_limit:   f64,
    pub drawing_power:    f64,
    pub irregular_amount: f64,
    pub interest_rate:    f64,
    pub sma_class:        String,
    pub irac:             String,
    pub utilization:      Option<f64>,
    pub dp_gap:           f64,
    pub irregular_flag:   String, // Irregular | Overdrawn | Regular
}

impl Keyed for CcodAccount {
    fn key(&self) -> &str {
        &self.account_no
    }

    fn cif(&self) -> Option<&str> {
        Some(&self.cif)
    }
}

// ── NPA ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpaAccount {
    pub account_no:       AccountNo,
    pub cif:              Cif,
    pub customer_name:    String,
    pub outstanding:      f64,
    pub npa_date:         Option<NaiveDate>,
    pub irac:             String,
    pub irac_description: String,
    pub provision_amount: f64,
}

impl Keyed for NpaAccount {
    fn key(&self) -> &str {
        &self.account_no
    }

    fn cif(&self) -> Option<&str> {
        Some(&self.cif)
    }
}

// ── Customer dimension ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub cif:                      Cif,
    pub customer_name:            String,
    pub total_deposits:           f64,
    pub total_loans:              f64,
    pub total_ccod:               f64,
    pub total_relationship_value: f64,
    pub net_exposure:             f64,
    pub deposit_count:            u32,
    pub loan_count:               u32,
    pub ccod_count:               u32,
    pub hni_category:             String,
    pub customer_segment:         String,
    pub is_nri:                   bool,
    pub is_wealth:                bool,
    pub is_salary:                bool,
    pub has_npa:                  bool,
}

impl Keyed for CustomerRecord {
    fn key(&self) -> &str {
        &self.cif
    }

    fn cif(&self) -> Option<&str> {
        Some(&self.cif)
    }
}

// ── Audit ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadLogEntry {
    pub id:            Option<i64>,
    pub upload_id:     String,
    pub file_type:     String,
    pub file_name:     String,
    pub record_count:  usize,
    pub status:        String, // success | error
    pub error_message: Option<String>,
    pub timestamp:     String,
}

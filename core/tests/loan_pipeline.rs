//! Loan uploads: shadow merge, classification sources, risk weights and
//! the HasNPA flag on the rebuilt customer.

use branch_ingest_core::{
    engine::IngestEngine,
    records::{CustomerRecord, LoanAccount, NpaAccount},
    store::Table,
};
use chrono::NaiveDate;

const LOAN_MAPPING: &str = "\
PRODUCT_CODE,CATEGORY,SUB_CATEGORY,SEGMENT,PRIORITY,SECURED,SCHEME,RISK_WEIGHT
HL-02,Home Loan,Housing - Individual,Retail,Priority,Secured,HL-GEN,0.35
";

const SHADOW: &str = "\
ACCOUNT_NO,CIF_NO,CUSTOMER_NAME,ACCT_TYPE,INT_CAT,SANCTION_DATE,MATURITY_DATE,SANCTION_LIMIT,EMI_AMOUNT,EMI_DUE,EMI_PAID,EMI_OVERDUE,ARREAR_AMOUNT,IRAC,MOBILE,ADDRESS
0009001,0077,ANIL MEHTA,HL,02,10/03/2019,10/03/2029,3000000,30000,30000,0,30000,60000,06,9811111111,MG ROAD
";

const BALANCE: &str = "\
ACCOUNT_NO,CIF_NO,CUSTOMER_NAME,ACCT_DESC,OUTSTANDING,INTEREST_RATE,INSTALLMENT_AMOUNT,SMA_CLASS,IRAC,SEGMENT_CODE
0009001,0077,ANIL MEHTA,HOUSING LOAN,1500000,8,,,06,
0009002,0078,PRIYA NAIR,PERSONAL LOAN,200000,12,6000,SMA1,05,
0009003,0079,STAFF MEMBER,VEHICLE LOAN,300000,7,,,01,STF
";

fn engine() -> IngestEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("date");
    IngestEngine::build_test(today).expect("test engine")
}

fn loan(engine: &IngestEngine, account: &str) -> LoanAccount {
    engine
        .store
        .get(Table::Loan, account)
        .expect("read loan")
        .unwrap_or_else(|| panic!("loan {account} missing"))
}

#[test]
fn shadow_and_mapping_drive_classification() {
    let mut engine = engine();
    engine.upload("Loan_Product_Mapping.csv", LOAN_MAPPING).expect("mapping");
    engine.upload("LOAN_SHADOW_0324.csv", SHADOW).expect("shadow");
    let outcome = engine.upload("loan_balance_0324.csv", BALANCE).expect("balance");
    assert_eq!(outcome.record_count, 3);

    let home = loan(&engine, "9001");
    assert!(home.shadow_found);
    assert_eq!(home.product_code, "HL-02");
    assert_eq!(home.category, "Home Loan");
    assert_eq!(home.classification_source, "mapping");
    assert_eq!(home.product_risk_weight, Some(0.35));
    assert_eq!(home.shadow_emi_overdue, 30_000.0);
    assert_eq!(home.shadow_arrear_amount, 60_000.0);
    assert_eq!(home.shadow_mobile, "9811111111");
    assert_eq!(home.months_to_maturity, Some(60));
    assert_eq!(home.remaining_tenure_percent, Some(0.5));
    // Installment missing on the balance row: shadow EMI fills in.
    assert_eq!(home.installment_amount, Some(30_000.0));
    assert_eq!(home.monthly_interest_component, Some(10_000.0));
    assert_eq!(home.monthly_principal_component, Some(20_000.0));
    // No SMA class, IRAC 06.
    assert_eq!(home.irac, "6");
    assert_eq!(home.risk_weight, 0.05);

    let personal = loan(&engine, "9002");
    assert!(!personal.shadow_found);
    assert_eq!(personal.category, "Personal Loan");
    assert_eq!(personal.classification_source, "keyword");
    assert_eq!(personal.risk_weight, 0.65);

    let staff = loan(&engine, "9003");
    assert_eq!(staff.category, "Staff Loan");
    assert_eq!(staff.segment, "Staff");
    assert_eq!(staff.classification_source, "staff_override");
}

#[test]
fn npa_irac_flags_customer() {
    let mut engine = engine();
    engine.upload("LOAN_SHADOW_0324.csv", SHADOW).expect("shadow");
    engine.upload("loan_balance_0324.csv", BALANCE).expect("balance");

    let c: CustomerRecord = engine.store.get(Table::Customer, "77").unwrap().unwrap();
    assert!(c.has_npa);
    assert_eq!(c.total_loans, 1_500_000.0);
    assert_eq!(c.loan_count, 1);
    assert_eq!(c.net_exposure, -1_500_000.0);

    // IRAC 01 is standard.
    let staff: CustomerRecord = engine.store.get(Table::Customer, "79").unwrap().unwrap();
    assert!(!staff.has_npa);
}

#[test]
fn balance_before_shadow_degrades_then_recovers_on_reupload() {
    let mut engine = engine();
    engine.upload("loan_balance_0324.csv", BALANCE).expect("balance first");
    let first = loan(&engine, "9001");
    assert!(!first.shadow_found);
    assert_eq!(first.classification_source, "keyword");
    assert_eq!(first.category, "Home Loan");
    assert_eq!(first.months_to_maturity, None);
    assert_eq!(first.shadow_emi_due, 0.0);

    engine.upload("LOAN_SHADOW_0324.csv", SHADOW).expect("shadow");
    // Shadow uploads do not rewrite the loan table.
    assert!(!loan(&engine, "9001").shadow_found);

    engine.upload("loan_balance_0324.csv", BALANCE).expect("balance again");
    let merged = loan(&engine, "9001");
    assert!(merged.shadow_found);
    assert_eq!(merged.shadow_sanction_limit, 3_000_000.0);
    assert_eq!(engine.store.count(Table::Loan).unwrap(), 3);
}

#[test]
fn npa_listing_flags_known_customers_only() {
    let mut engine = engine();
    engine
        .upload(
            "deposit_shadow.csv",
            "ACCOUNT_NO,CIF_NO,CUSTOMER_NAME,CURRENT_BALANCE,AVAILABLE_BALANCE\n\
             44,55,LATA DESAI,1000,1000\n",
        )
        .expect("deposit");
    engine
        .upload(
            "npa_report_0324.csv",
            "ACCOUNT_NO,CIF_NO,CUSTOMER_NAME,OUTSTANDING,NPA_DATE,IRAC,PROVISION\n\
             0301,0055,LATA DESAI,80000,30/09/2023,05,\"20,000\"\n\
             0302,0999,GHOST,5000,00/00/0000,04,500\n",
        )
        .expect("npa");

    let npa: NpaAccount = engine.store.get(Table::Npa, "301").unwrap().unwrap();
    assert_eq!(npa.irac_description, "Doubtful");
    assert_eq!(npa.provision_amount, 20_000.0);
    assert_eq!(npa.npa_date, NaiveDate::from_ymd_opt(2023, 9, 30));
    let ghost: NpaAccount = engine.store.get(Table::Npa, "302").unwrap().unwrap();
    assert_eq!(ghost.npa_date, None);

    let c: CustomerRecord = engine.store.get(Table::Customer, "55").unwrap().unwrap();
    assert!(c.has_npa);
    let missing: Option<CustomerRecord> = engine.store.get(Table::Customer, "999").unwrap();
    assert!(missing.is_none());
}

//! Customer dimension builder.
//!
//! The customer table is fully derived: every rebuild rescans the current
//! deposit, loan, CC/OD and NPA tables and replaces the table wholesale.
//! Nothing is merged into the previous snapshot.
//!
//! Sign conventions of the core banking extract:
//!   - a deposit with a negative balance is an informal overdraft (a loan),
//!   - a loan with a negative outstanding is a credit balance (a deposit),
//!   - a CC/OD account in credit counts as a deposit.

use crate::{
    config::PipelineConfig,
    dedup::overlapping_accounts,
    error::IngestResult,
    records::{CcodAccount, CustomerRecord, DepositAccount, LoanAccount, NpaAccount},
    store::{IngestStore, Table},
    transform::deposit::hni_category,
};
use std::collections::BTreeMap;

/// Segment priority: Ultra HNI > HNI > NRI > Wealth > Salary > Regular.
pub fn customer_segment(c: &CustomerRecord) -> &'static str {
    match c.hni_category.as_str() {
        "Ultra HNI" => "Ultra HNI",
        "HNI" => "HNI",
        _ if c.is_nri => "NRI",
        _ if c.is_wealth => "Wealth",
        _ if c.is_salary => "Salary",
        _ => "Regular",
    }
}

fn entry<'a>(
    customers: &'a mut BTreeMap<String, CustomerRecord>,
    cif: &str,
    name: &str,
) -> &'a mut CustomerRecord {
    let c = customers
        .entry(cif.to_string())
        .or_insert_with(|| CustomerRecord {
            cif: cif.to_string(),
            ..Default::default()
        });
    if c.customer_name.is_empty() && !name.trim().is_empty() {
        c.customer_name = name.trim().to_string();
    }
    c
}

pub fn build_customers(
    deposits: &[DepositAccount],
    loans: &[LoanAccount],
    ccod: &[CcodAccount],
    npa: &[NpaAccount],
    config: &PipelineConfig,
) -> Vec<CustomerRecord> {
    let mut customers: BTreeMap<String, CustomerRecord> = BTreeMap::new();

    // (a) The deposit transformer already dropped CC/OD twins, but the
    // tables may come from uploads in either order.
    let overlap = overlapping_accounts(
        deposits.iter().map(|d| d.account_no.as_str()),
        ccod.iter().map(|c| c.account_no.as_str()),
    );

    // (b) Deposits.
    for d in deposits.iter().filter(|d| !overlap.contains(&d.account_no)) {
        if d.cif.is_empty() {
            continue;
        }
        let c = entry(&mut customers, &d.cif, &d.customer_name);
        if d.current_balance > 0.0 {
            c.total_deposits += d.current_balance;
            c.deposit_count += 1;
        } else if d.current_balance < 0.0 {
            c.total_loans += d.current_balance.abs();
            c.loan_count += 1;
        }
        c.is_nri |= d.is_nri;
        c.is_wealth |= d.is_wealth;
        c.is_salary |= d.is_salary;
    }

    // (c) Loans.
    for l in loans.iter().filter(|l| !l.cif.is_empty()) {
        let c = entry(&mut customers, &l.cif, &l.customer_name);
        if l.outstanding > 0.0 {
            c.total_loans += l.outstanding;
            c.loan_count += 1;
        } else if l.outstanding < 0.0 {
            c.total_deposits += l.outstanding.abs();
            c.deposit_count += 1;
        }
        if !l.irac.is_empty() && !config.is_standard_loan_irac(&l.irac) {
            c.has_npa = true;
        }
    }

    // (d) CC/OD. A zero balance still counts as a facility.
    for a in ccod.iter().filter(|a| !a.cif.is_empty()) {
        let c = entry(&mut customers, &a.cif, &a.customer_name);
        if a.balance > 0.0 {
            c.total_deposits += a.balance;
        } else if a.balance < 0.0 {
            c.total_ccod += a.balance.abs();
        }
        c.ccod_count += 1;
        if !a.irac.is_empty() && !config.is_standard_ccod_irac(&a.irac) {
            c.has_npa = true;
        }
    }

    // (e) NPA listing flags known customers only.
    for n in npa {
        if let Some(c) = customers.get_mut(&n.cif) {
            c.has_npa = true;
        }
    }

    // (f) Finalize.
    customers
        .into_values()
        .map(|mut c| {
            c.total_relationship_value =
                c.total_deposits.abs() + c.total_loans.abs() + c.total_ccod.abs();
            c.net_exposure = c.total_deposits - c.total_loans - c.total_ccod;
            c.hni_category = hni_category(c.total_deposits, &config.hni).to_string();
            c.customer_segment = customer_segment(&c).to_string();
            c
        })
        .collect()
}

/// Rescan the four domain tables and replace the customer table.
/// Returns the number of customer records written.
pub fn rebuild(store: &IngestStore, config: &PipelineConfig) -> IngestResult<usize> {
    let deposits: Vec<DepositAccount> = store.get_all(Table::Deposit)?;
    let loans: Vec<LoanAccount> = store.get_all(Table::Loan)?;
    let ccod: Vec<CcodAccount> = store.get_all(Table::Ccod)?;
    let npa: Vec<NpaAccount> = store.get_all(Table::Npa)?;

    let customers = build_customers(&deposits, &loans, &ccod, &npa, config);
    store.replace_all(Table::Customer, &customers)?;

    log::info!(
        "customer: rebuilt {} customers from {} deposits, {} loans, {} ccod, {} npa",
        customers.len(),
        deposits.len(),
        loans.len(),
        ccod.len(),
        npa.len()
    );
    Ok(customers.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(hni: &str, nri: bool, wealth: bool, salary: bool) -> CustomerRecord {
        CustomerRecord {
            hni_category: hni.into(),
            is_nri: nri,
            is_wealth: wealth,
            is_salary: salary,
            ..Default::default()
        }
    }

    #[test]
    fn segment_priority() {
        assert_eq!(customer_segment(&customer("Ultra HNI", true, true, true)), "Ultra HNI");
        assert_eq!(customer_segment(&customer("HNI", true, true, true)), "HNI");
        assert_eq!(customer_segment(&customer("Regular", true, true, true)), "NRI");
        assert_eq!(customer_segment(&customer("Regular", false, true, true)), "Wealth");
        assert_eq!(customer_segment(&customer("Regular", false, false, true)), "Salary");
        assert_eq!(customer_segment(&customer("Regular", false, false, false)), "Regular");
    }
}

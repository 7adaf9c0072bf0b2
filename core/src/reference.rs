//! Reference resolver: ProductCode lookups over the two mapping tables.
//!
//! Rebuilt from the store on every transformer run so a freshly uploaded
//! mapping file takes effect on the next upload. There is no cache.

use crate::{
    error::IngestResult,
    records::{LoanProductMapping, ProductMapping},
    store::{IngestStore, Table},
    types::ProductCode,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub deposit: HashMap<ProductCode, ProductMapping>,
    pub loan:    HashMap<ProductCode, LoanProductMapping>,
}

impl ReferenceTables {
    pub fn load(store: &IngestStore) -> IngestResult<Self> {
        let deposit = store
            .get_all::<ProductMapping>(Table::ProductMapping)?
            .into_iter()
            .map(|m| (m.product_code.clone(), m))
            .collect();
        let loan = store
            .get_all::<LoanProductMapping>(Table::LoanProductMapping)?
            .into_iter()
            .map(|m| (m.product_code.clone(), m))
            .collect();
        Ok(Self { deposit, loan })
    }

    pub fn deposit_product(&self, code: &str) -> Option<&ProductMapping> {
        self.deposit.get(code)
    }

    pub fn loan_product(&self, code: &str) -> Option<&LoanProductMapping> {
        self.loan.get(code)
    }
}

/// `TYPE-CAT`, or whichever half is present.
pub fn product_code(acct_type: &str, int_cat: &str) -> ProductCode {
    let (t, c) = (acct_type.trim(), int_cat.trim());
    match (t.is_empty(), c.is_empty()) {
        (false, false) => format!("{t}-{c}"),
        (false, true) => t.to_string(),
        (true, false) => c.to_string(),
        (true, true) => String::new(),
    }
}

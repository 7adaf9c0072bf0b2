//! Domain transformers.
//!
//! RULE: Every transformer implements Transformer.
//! A transformer reads the rows of one file type, enriches them, and
//! replaces exactly one target table (the deposit transformer also refreshes
//! its audit shadow table). Cross-table reads go through the store; a missing
//! cross reference degrades to defaults, never to an error.
//!
//! The classification logic lives in pure functions next to each
//! transformer so it can be exercised without a database.

use crate::{
    config::PipelineConfig,
    detector::FileType,
    error::IngestResult,
    parser::RawRow,
    store::IngestStore,
};
use chrono::NaiveDate;

pub mod ccod;
pub mod deposit;
pub mod loan_balance;
pub mod loan_shadow;
pub mod mapping;
pub mod npa;

/// Everything a transformer may consult besides its own rows.
pub struct TransformContext<'a> {
    pub store:  &'a IngestStore,
    pub config: &'a PipelineConfig,
    /// Reference date for day and month arithmetic.
    pub today:  NaiveDate,
}

/// The contract every transformer must fulfill.
pub trait Transformer: Send {
    /// Unique stable name for this transformer.
    fn name(&self) -> &'static str;

    /// The file type routed to this transformer by the detector.
    fn file_type(&self) -> FileType;

    /// Transform `rows` and replace the target table.
    /// Returns the number of records written to the target table.
    fn run(&self, rows: &[RawRow], ctx: &TransformContext<'_>) -> IngestResult<usize>;
}

/// The full transformer set, one per file type.
pub fn all() -> Vec<Box<dyn Transformer>> {
    vec![
        Box::new(mapping::ProductMappingTransformer),
        Box::new(mapping::LoanProductMappingTransformer),
        Box::new(deposit::DepositTransformer),
        Box::new(loan_shadow::LoanShadowTransformer),
        Box::new(loan_balance::LoanBalanceTransformer),
        Box::new(ccod::CcodTransformer),
        Box::new(npa::NpaTransformer),
    ]
}

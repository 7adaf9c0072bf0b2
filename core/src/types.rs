//! Shared primitive types used across the pipeline.

/// A normalized account number (leading zeros stripped).
pub type AccountNo = String;

/// A normalized Customer Information File number.
pub type Cif = String;

/// Derived `TYPE-CAT` product code used to join mapping tables.
pub type ProductCode = String;

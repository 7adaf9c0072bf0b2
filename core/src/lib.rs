//! Branch portfolio ingest: flat-file extracts from core banking are
//! detected, normalized, classified and stored, and a per-customer
//! dimension is rebuilt from the results.

pub mod clock;
pub mod config;
pub mod customer;
pub mod dedup;
pub mod detector;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod records;
pub mod reference;
pub mod store;
pub mod transform;
pub mod types;

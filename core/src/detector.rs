//! File-type detector — routes an uploaded file to its transformer.
//!
//! Filename keywords are checked first, in a fixed order. NPA checks run
//! before the loan-balance checks because NPA listings are usually named
//! after the loan book ("NPA_LOAN_BALANCE.csv"). When no filename rule
//! fires, header co-occurrence rules decide; more than one header match is
//! reported as ambiguous rather than guessed.

use crate::error::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    ProductMapping,
    LoanProductMapping,
    DepositShadow,
    LoanShadow,
    LoanBalance,
    CcodBalance,
    NpaReport,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::ProductMapping     => "product_mapping",
            FileType::LoanProductMapping => "loan_product_mapping",
            FileType::DepositShadow      => "deposit_shadow",
            FileType::LoanShadow         => "loan_shadow",
            FileType::LoanBalance        => "loan_balance",
            FileType::CcodBalance        => "ccod_balance",
            FileType::NpaReport          => "npa_report",
        }
    }

    /// Uploads of these types change an input of the customer dimension.
    pub fn feeds_customer_dimension(self) -> bool {
        matches!(
            self,
            FileType::DepositShadow
                | FileType::LoanBalance
                | FileType::CcodBalance
                | FileType::NpaReport
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Matched(FileType),
    Unknown,
    Ambiguous(Vec<FileType>),
}

impl Detection {
    pub fn into_result(self, file_name: &str) -> IngestResult<FileType> {
        match self {
            Detection::Matched(t) => Ok(t),
            Detection::Unknown => Err(IngestError::UnrecognizedFile {
                file_name: file_name.to_string(),
            }),
            Detection::Ambiguous(candidates) => Err(IngestError::AmbiguousFile {
                file_name:  file_name.to_string(),
                candidates: candidates.iter().map(|t| t.as_str().to_string()).collect(),
            }),
        }
    }
}

pub fn detect(file_name: &str, headers: &[String]) -> Detection {
    if let Some(t) = detect_by_name(file_name) {
        return Detection::Matched(t);
    }
    let matches = detect_by_headers(headers);
    match matches.len() {
        0 => Detection::Unknown,
        1 => Detection::Matched(matches[0]),
        _ => Detection::Ambiguous(matches),
    }
}

/// Lower-case words of the final path component, split on `_`, `-`, `.`
/// and spaces, with trailing digits dropped ("npa0324" reads as "npa").
fn name_tokens(file_name: &str) -> Vec<String> {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    name.to_ascii_lowercase()
        .split(['_', '-', '.', ' '])
        .map(|t| t.trim_end_matches(|c: char| c.is_ascii_digit()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn detect_by_name(file_name: &str) -> Option<FileType> {
    let tokens = name_tokens(file_name);
    // Whole words only, singular or plural.
    let has = |k: &str| {
        tokens
            .iter()
            .any(|t| t == k || t.strip_suffix('s') == Some(k))
    };

    if has("npa") {
        Some(FileType::NpaReport)
    } else if has("loan") && (has("mapping") || has("product")) {
        Some(FileType::LoanProductMapping)
    } else if has("mapping") || has("product") {
        Some(FileType::ProductMapping)
    } else if has("shadow") && has("loan") {
        Some(FileType::LoanShadow)
    } else if has("deposit") || (has("shadow") && has("dep")) {
        Some(FileType::DepositShadow)
    } else if has("ccod") || (has("cc") && has("od")) || has("overdraft") {
        Some(FileType::CcodBalance)
    } else if has("loan") || has("balance") {
        Some(FileType::LoanBalance)
    } else {
        None
    }
}

fn detect_by_headers(headers: &[String]) -> Vec<FileType> {
    let set: HashSet<String> = headers.iter().map(|h| h.trim().to_ascii_uppercase()).collect();
    let has = |h: &str| set.contains(h);
    let any = |hs: &[&str]| hs.iter().any(|h| set.contains(*h));

    let rules: [(FileType, bool); 7] = [
        (
            FileType::NpaReport,
            has("NPA_DATE") || has("IRAC_DESC") || (has("PROVISION") && has("IRAC")),
        ),
        (FileType::CcodBalance, has("DRAWING_POWER")),
        (FileType::LoanBalance, has("OUTSTANDING") && has("SMA_CLASS")),
        (
            FileType::LoanShadow,
            has("SANCTION_DATE") && any(&["EMI_DUE", "EMI_AMOUNT"]),
        ),
        (
            FileType::DepositShadow,
            has("FROZEN_AMOUNT") || (has("CURRENT_BALANCE") && has("AVAILABLE_BALANCE")),
        ),
        (
            FileType::LoanProductMapping,
            has("CATEGORY") && any(&["RISK_WEIGHT", "PRIORITY", "SECURED"]),
        ),
        (
            FileType::ProductMapping,
            has("CATEGORY") && any(&["PROD_TYPE", "SALARY", "WEALTH", "SENIOR", "NRI"]),
        ),
    ];

    rules
        .into_iter()
        .filter(|(_, matched)| *matched)
        .map(|(t, _)| t)
        .collect()
}

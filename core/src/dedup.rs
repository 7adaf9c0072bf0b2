//! Deposit / CC-OD overlap.
//!
//! The core banking extract lists some overdraft-capable accounts in both the
//! deposit file and the CC/OD file. The exposure belongs to CC/OD, so the
//! deposit side drops every account number present in both.

use std::collections::HashSet;

/// Account numbers present in both sets. Inputs must already be normalized.
pub fn overlapping_accounts<'a, D, C>(deposit_accounts: D, ccod_accounts: C) -> HashSet<String>
where
    D: IntoIterator<Item = &'a str>,
    C: IntoIterator<Item = &'a str>,
{
    let ccod: HashSet<&str> = ccod_accounts.into_iter().collect();
    deposit_accounts
        .into_iter()
        .filter(|a| ccod.contains(a))
        .map(str::to_string)
        .collect()
}

//! Authorization checks.
//!
//! The ledger trusts that the caller proved control of `signer` before the
//! request arrived; here it only compares that identity to the stored field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::identity::Identity;
use crate::state::{Mint, TokenAccount};

/// Which stored field a signer was checked against.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityRole {
    MintAuthority,
    Owner,
}

impl fmt::Display for AuthorityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityRole::MintAuthority => f.write_str("mint authority"),
            AuthorityRole::Owner => f.write_str("owner"),
        }
    }
}

pub fn require_authority(
    record: &Identity,
    role: AuthorityRole,
    expected: &Identity,
    signer: &Identity,
) -> Result<(), LedgerError> {
    if expected != signer {
        return Err(LedgerError::Unauthorized {
            record: *record,
            role,
            signer: *signer,
        });
    }
    Ok(())
}

pub fn require_mint_authority(
    mint_id: &Identity,
    mint: &Mint,
    signer: &Identity,
) -> Result<(), LedgerError> {
    require_authority(mint_id, AuthorityRole::MintAuthority, &mint.mint_authority, signer)
}

pub fn require_owner(
    account_id: &Identity,
    account: &TokenAccount,
    signer: &Identity,
) -> Result<(), LedgerError> {
    require_authority(account_id, AuthorityRole::Owner, &account.owner, signer)
}

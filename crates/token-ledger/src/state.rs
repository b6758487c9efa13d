use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::LedgerError;
use crate::identity::Identity;

/// A token type: decimal precision and the identity allowed to mint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mint {
    pub decimals: u8,
    pub mint_authority: Identity,
    /// Total minted so far, `None` when supply tracking is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply: Option<Amount>,
}

/// One owner's holding of a token type.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAccount {
    pub owner: Identity,
    pub balance: Amount,
    /// Bootstrap records are not tied to a mint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint: Option<Identity>,
}

impl TokenAccount {
    /// Fails with [`LedgerError::MintMismatch`] when this record is tied to a
    /// mint other than `mint`. Unassociated records accept any mint.
    pub fn check_mint(&self, account: &Identity, mint: &Identity) -> Result<(), LedgerError> {
        match self.mint {
            Some(actual) if actual != *mint => Err(LedgerError::MintMismatch {
                account: *account,
                expected: *mint,
                actual,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Mint(Mint),
    TokenAccount(TokenAccount),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Mint(_) => RecordKind::Mint,
            Record::TokenAccount(_) => RecordKind::TokenAccount,
        }
    }

    pub fn as_mint(&self) -> Option<&Mint> {
        match self {
            Record::Mint(mint) => Some(mint),
            Record::TokenAccount(_) => None,
        }
    }

    pub fn as_token_account(&self) -> Option<&TokenAccount> {
        match self {
            Record::TokenAccount(account) => Some(account),
            Record::Mint(_) => None,
        }
    }
}

impl From<Mint> for Record {
    fn from(mint: Mint) -> Self {
        Record::Mint(mint)
    }
}

impl From<TokenAccount> for Record {
    fn from(account: TokenAccount) -> Self {
        Record::TokenAccount(account)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Mint,
    TokenAccount,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Mint => f.write_str("mint"),
            RecordKind::TokenAccount => f.write_str("token account"),
        }
    }
}

/// How a new balance record is funded at creation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Fixed starting balance from [`crate::LedgerConfig::bootstrap_balance`].
    Bootstrap,
    /// Starts at zero; funded by a later mint-to.
    Zero,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_tagged_by_kind() {
        let record = Record::from(TokenAccount {
            owner: Identity::new([1u8; 32]),
            balance: 1_000,
            mint: None,
        });
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["kind"], "token_account");
        assert_eq!(json["balance"], 1_000);
        assert!(json.get("mint").is_none());
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert!(back.as_mint().is_none());
    }

    #[test]
    fn unassociated_accounts_accept_any_mint() {
        let account_id = Identity::new([9u8; 32]);
        let mint_a = Identity::new([2u8; 32]);
        let mint_b = Identity::new([3u8; 32]);
        let mut account = TokenAccount {
            owner: Identity::new([1u8; 32]),
            balance: 0,
            mint: None,
        };
        assert!(account.check_mint(&account_id, &mint_a).is_ok());
        account.mint = Some(mint_a);
        assert!(account.check_mint(&account_id, &mint_a).is_ok());
        assert_eq!(
            account.check_mint(&account_id, &mint_b).unwrap_err(),
            LedgerError::MintMismatch {
                account: account_id,
                expected: mint_b,
                actual: mint_a,
            }
        );
    }
}

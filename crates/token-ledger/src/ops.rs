//! The ledger transitions.
//!
//! Each function reads the records it needs from `store`, checks every
//! precondition, and only then commits one [`WriteSet`]. Any error returned
//! here means the store was not touched.

use crate::amount::{checked_credit, checked_debit, Amount};
use crate::auth::{require_mint_authority, require_owner};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::identity::Identity;
use crate::state::{Mint, Record, RecordKind, TokenAccount};
use crate::store::{RecordStore, WriteSet};

/// Records touched by a successful mint-to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Minted {
    pub mint: Mint,
    pub account: TokenAccount,
}

/// Both sides of a successful transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transferred {
    pub from: TokenAccount,
    pub to: TokenAccount,
}

pub fn load_mint<S: RecordStore + ?Sized>(store: &S, id: &Identity) -> Result<Mint, LedgerError> {
    store
        .get(id)
        .as_ref()
        .and_then(Record::as_mint)
        .copied()
        .ok_or(LedgerError::NotFound {
            kind: RecordKind::Mint,
            id: *id,
        })
}

pub fn load_token_account<S: RecordStore + ?Sized>(
    store: &S,
    id: &Identity,
) -> Result<TokenAccount, LedgerError> {
    store
        .get(id)
        .as_ref()
        .and_then(Record::as_token_account)
        .copied()
        .ok_or(LedgerError::NotFound {
            kind: RecordKind::TokenAccount,
            id: *id,
        })
}

fn ensure_vacant<S: RecordStore + ?Sized>(store: &S, id: &Identity) -> Result<(), LedgerError> {
    if store.contains(id) {
        return Err(LedgerError::AlreadyExists { id: *id });
    }
    Ok(())
}

fn insert<S: RecordStore + ?Sized>(store: &mut S, id: Identity, record: impl Into<Record>) {
    let mut writes = WriteSet::new();
    writes.put(id, record);
    store.commit(writes);
}

pub fn create_mint<S: RecordStore + ?Sized>(
    store: &mut S,
    config: &LedgerConfig,
    mint_id: Identity,
    decimals: u8,
    authority: Identity,
) -> Result<Mint, LedgerError> {
    ensure_vacant(store, &mint_id)?;
    let mint = Mint {
        decimals,
        mint_authority: authority,
        supply: config.track_supply.then_some(0),
    };
    insert(store, mint_id, mint);
    Ok(mint)
}

/// Create a balance record holding [`LedgerConfig::bootstrap_balance`].
///
/// The record is not tied to any mint.
pub fn create_bootstrap_account<S: RecordStore + ?Sized>(
    store: &mut S,
    config: &LedgerConfig,
    account_id: Identity,
    owner: Identity,
) -> Result<TokenAccount, LedgerError> {
    ensure_vacant(store, &account_id)?;
    let account = TokenAccount {
        owner,
        balance: config.bootstrap_balance,
        mint: None,
    };
    insert(store, account_id, account);
    Ok(account)
}

/// Create an empty balance record of an existing mint.
pub fn create_zeroed_account<S: RecordStore + ?Sized>(
    store: &mut S,
    account_id: Identity,
    owner: Identity,
    mint_id: Identity,
) -> Result<TokenAccount, LedgerError> {
    ensure_vacant(store, &account_id)?;
    load_mint(store, &mint_id)?;
    let account = TokenAccount {
        owner,
        balance: 0,
        mint: Some(mint_id),
    };
    insert(store, account_id, account);
    Ok(account)
}

/// Create the empty balance record at [`Identity::associated_account`].
pub fn create_associated_account<S: RecordStore + ?Sized>(
    store: &mut S,
    owner: Identity,
    mint_id: Identity,
) -> Result<(Identity, TokenAccount), LedgerError> {
    let account_id = Identity::associated_account(&owner, &mint_id);
    let account = create_zeroed_account(store, account_id, owner, mint_id)?;
    Ok((account_id, account))
}

pub fn mint_to<S: RecordStore + ?Sized>(
    store: &mut S,
    mint_id: Identity,
    to: Identity,
    authority: Identity,
    amount: Amount,
) -> Result<Minted, LedgerError> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    let mut mint = load_mint(store, &mint_id)?;
    require_mint_authority(&mint_id, &mint, &authority)?;
    let mut account = load_token_account(store, &to)?;
    account.check_mint(&to, &mint_id)?;

    account.balance = checked_credit(&to, account.balance, amount)?;
    if let Some(supply) = mint.supply {
        mint.supply = Some(checked_credit(&mint_id, supply, amount)?);
    }

    let mut writes = WriteSet::new();
    writes.put(to, account);
    if mint.supply.is_some() {
        writes.put(mint_id, mint);
    }
    store.commit(writes);
    Ok(Minted { mint, account })
}

pub fn transfer<S: RecordStore + ?Sized>(
    store: &mut S,
    from_id: Identity,
    to_id: Identity,
    owner: Identity,
    amount: Amount,
) -> Result<Transferred, LedgerError> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    if from_id == to_id {
        return Err(LedgerError::SelfTransfer { account: from_id });
    }
    let mut from = load_token_account(store, &from_id)?;
    let mut to = load_token_account(store, &to_id)?;
    require_owner(&from_id, &from, &owner)?;
    if let (Some(source_mint), Some(_)) = (from.mint, to.mint) {
        to.check_mint(&to_id, &source_mint)?;
    }

    // Both balances are computed before anything is staged, so a credit
    // overflow on `to` leaves `from` undebited.
    let debited = checked_debit(&from_id, from.balance, amount)?;
    let credited = checked_credit(&to_id, to.balance, amount)?;
    from.balance = debited;
    to.balance = credited;

    let mut writes = WriteSet::new();
    writes.put(from_id, from);
    writes.put(to_id, to);
    store.commit(writes);
    Ok(Transferred { from, to })
}

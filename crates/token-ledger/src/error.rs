use thiserror::Error;

use crate::amount::Amount;
use crate::auth::AuthorityRole;
use crate::identity::Identity;
use crate::state::RecordKind;

/// Every way a ledger transition can be rejected.
///
/// A rejected transition never mutates the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The target identity already names a record.
    #[error("record {id} already exists")]
    AlreadyExists { id: Identity },

    /// A referenced record is missing, or exists with the other record kind.
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: Identity },

    /// The claimed authority does not match the stored one.
    #[error("{signer} is not the {role} of {record}")]
    Unauthorized {
        record: Identity,
        role: AuthorityRole,
        signer: Identity,
    },

    /// A debit exceeds the available balance.
    #[error("insufficient funds in {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: Identity,
        balance: Amount,
        requested: Amount,
    },

    /// A credit would exceed the representable range of the record's counter.
    #[error("arithmetic overflow on {record}: {current} + {amount}")]
    Overflow {
        record: Identity,
        current: Amount,
        amount: Amount,
    },

    /// Mint-to and transfer only accept positive amounts.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Transfer source and destination must be distinct records.
    #[error("cannot transfer from {account} to itself")]
    SelfTransfer { account: Identity },

    /// The balance record belongs to a different mint.
    #[error("account {account} holds mint {actual}, expected {expected}")]
    MintMismatch {
        account: Identity,
        expected: Identity,
        actual: Identity,
    },
}

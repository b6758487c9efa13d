//! Accounting core of a fungible-token ledger.
//!
//! The crate is a small deterministic state machine over two record types:
//!
//! * [`state::Mint`]: a token type's decimal precision and the identity
//!   allowed to mint new supply.
//! * [`state::TokenAccount`]: one owner's balance of a token type.
//!
//! Four transitions mutate them, see [`ops`]: create a mint, create a balance
//! record (bootstrap or zero-initialized), mint new supply into a record, and
//! transfer between records. Every transition reads its records from an
//! injected [`store::RecordStore`], validates all preconditions, and commits
//! its writes as a single [`store::WriteSet`], so a failed request never leaves
//! partial state behind.
//!
//! [`ledger::Ledger`] wraps a store with request dispatch, an event journal, a
//! chained receipt per accepted request, and a sha256 state root. It performs
//! no I/O; persisting snapshots, loading keys and talking to users is left to
//! the caller.

pub mod amount;
pub mod auth;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod ops;
pub mod state;
pub mod store;

mod error;

pub use amount::Amount;
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use identity::{Identity, IdentityError};
pub use ledger::{
    Ledger, LedgerEvent, LedgerMeta, LedgerOutcome, LedgerRequest, LedgerSnapshot, Receipt,
    SnapshotError,
};
pub use state::{InitPolicy, Mint, Record, RecordKind, TokenAccount};
pub use store::{MemoryStore, RecordStore, WriteSet};

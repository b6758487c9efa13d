use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::amount::Amount;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::identity::{serde_digest, Identity};
use crate::ops;
use crate::state::{InitPolicy, Mint, Record, TokenAccount};
use crate::store::{MemoryStore, RecordStore, WriteSet};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerRequest {
    CreateMint {
        mint: Identity,
        decimals: u8,
        authority: Identity,
    },
    /// Bootstrap-policy balance record.
    CreateAccount {
        account: Identity,
        owner: Identity,
    },
    CreateZeroedAccount {
        account: Identity,
        owner: Identity,
        mint: Identity,
    },
    CreateAssociatedAccount {
        owner: Identity,
        mint: Identity,
    },
    MintTo {
        mint: Identity,
        to: Identity,
        authority: Identity,
        amount: Amount,
    },
    Transfer {
        from: Identity,
        to: Identity,
        owner: Identity,
        amount: Amount,
    },
}

impl LedgerRequest {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerRequest::CreateMint { .. } => "create_mint",
            LedgerRequest::CreateAccount { .. } => "create_account",
            LedgerRequest::CreateZeroedAccount { .. } => "create_zeroed_account",
            LedgerRequest::CreateAssociatedAccount { .. } => "create_associated_account",
            LedgerRequest::MintTo { .. } => "mint_to",
            LedgerRequest::Transfer { .. } => "transfer",
        }
    }

    /// Deterministic byte encoding hashed into the receipt digest.
    pub fn commitment(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.name().as_bytes());
        match self {
            LedgerRequest::CreateMint {
                mint,
                decimals,
                authority,
            } => {
                buf.extend_from_slice(mint.as_bytes());
                buf.push(*decimals);
                buf.extend_from_slice(authority.as_bytes());
            }
            LedgerRequest::CreateAccount { account, owner } => {
                buf.extend_from_slice(account.as_bytes());
                buf.extend_from_slice(owner.as_bytes());
            }
            LedgerRequest::CreateZeroedAccount {
                account,
                owner,
                mint,
            } => {
                buf.extend_from_slice(account.as_bytes());
                buf.extend_from_slice(owner.as_bytes());
                buf.extend_from_slice(mint.as_bytes());
            }
            LedgerRequest::CreateAssociatedAccount { owner, mint } => {
                buf.extend_from_slice(owner.as_bytes());
                buf.extend_from_slice(mint.as_bytes());
            }
            LedgerRequest::MintTo {
                mint,
                to,
                authority,
                amount,
            } => {
                buf.extend_from_slice(mint.as_bytes());
                buf.extend_from_slice(to.as_bytes());
                buf.extend_from_slice(authority.as_bytes());
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            LedgerRequest::Transfer {
                from,
                to,
                owner,
                amount,
            } => {
                buf.extend_from_slice(from.as_bytes());
                buf.extend_from_slice(to.as_bytes());
                buf.extend_from_slice(owner.as_bytes());
                buf.extend_from_slice(&amount.to_le_bytes());
            }
        }
        buf
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    MintCreated {
        mint: Identity,
        decimals: u8,
        authority: Identity,
    },
    AccountCreated {
        account: Identity,
        owner: Identity,
        mint: Option<Identity>,
        balance: Amount,
        policy: InitPolicy,
    },
    MintedTo {
        mint: Identity,
        to: Identity,
        amount: Amount,
    },
    Transferred {
        from: Identity,
        to: Identity,
        amount: Amount,
    },
}

/// Records as they stand after an accepted request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerOutcome {
    MintCreated {
        mint: Identity,
        record: Mint,
    },
    AccountCreated {
        account: Identity,
        record: TokenAccount,
    },
    MintedTo {
        mint: Identity,
        to: Identity,
        minted: ops::Minted,
    },
    Transferred {
        from: Identity,
        to: Identity,
        moved: ops::Transferred,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerMeta {
    pub height: u64,
    #[serde(with = "serde_digest::option", default)]
    pub last_receipt: Option<[u8; 32]>,
}

/// Proof that a request was accepted at `height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub height: u64,
    pub digest: [u8; 32],
    pub outcome: LedgerOutcome,
}

impl Receipt {
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: LedgerMeta,
    pub records: BTreeMap<Identity, Record>,
    pub events: Vec<LedgerEvent>,
    #[serde(with = "serde_digest")]
    pub state_root: [u8; 32],
}

impl LedgerSnapshot {
    pub fn verify(&self) -> Result<(), SnapshotError> {
        let actual = compute_state_root(self.records.iter().map(|(id, record)| (*id, *record)));
        if actual != self.state_root {
            return Err(SnapshotError::RootMismatch {
                expected: hex::encode(self.state_root),
                actual: hex::encode(actual),
            });
        }
        if self.events.len() as u64 != self.meta.height {
            return Err(SnapshotError::HeightMismatch {
                height: self.meta.height,
                events: self.events.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("state root mismatch: snapshot says {expected}, records hash to {actual}")]
    RootMismatch { expected: String, actual: String },
    #[error("snapshot height {height} does not match {events} journaled events")]
    HeightMismatch { height: u64, events: usize },
}

/// A record store plus the journal of every request it accepted.
#[derive(Debug)]
pub struct Ledger<S = MemoryStore> {
    store: S,
    config: LedgerConfig,
    meta: LedgerMeta,
    events: Vec<LedgerEvent>,
}

impl Ledger<MemoryStore> {
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(MemoryStore::new(), config)
    }

    /// Rebuild a ledger from a snapshot after checking its state root.
    pub fn restore(snapshot: LedgerSnapshot, config: LedgerConfig) -> Result<Self, SnapshotError> {
        snapshot.verify()?;
        Ok(Self {
            store: snapshot.records.into_iter().collect(),
            config,
            meta: snapshot.meta,
            events: snapshot.events,
        })
    }
}

impl<S: RecordStore> Ledger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            meta: LedgerMeta::default(),
            events: Vec::new(),
        }
    }

    pub fn meta(&self) -> &LedgerMeta {
        &self.meta
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn record(&self, id: &Identity) -> Option<Record> {
        self.store.get(id)
    }

    pub fn mint(&self, id: &Identity) -> Option<Mint> {
        ops::load_mint(&self.store, id).ok()
    }

    pub fn token_account(&self, id: &Identity) -> Option<TokenAccount> {
        ops::load_token_account(&self.store, id).ok()
    }

    /// Validate and apply one request.
    ///
    /// On error nothing changes: records, height, events and the receipt
    /// chain are exactly as before the call.
    pub fn apply(&mut self, request: &LedgerRequest) -> Result<Receipt, LedgerError> {
        match self.execute(request) {
            Ok((outcome, event)) => {
                let receipt = self.seal(request, outcome, event);
                tracing::debug!(
                    op = request.name(),
                    height = receipt.height,
                    receipt = %receipt.digest_hex(),
                    "request applied"
                );
                Ok(receipt)
            }
            Err(err) => {
                tracing::debug!(op = request.name(), error = %err, "request rejected");
                Err(err)
            }
        }
    }

    fn execute(
        &mut self,
        request: &LedgerRequest,
    ) -> Result<(LedgerOutcome, LedgerEvent), LedgerError> {
        let store = &mut self.store;
        match *request {
            LedgerRequest::CreateMint {
                mint,
                decimals,
                authority,
            } => {
                let record = ops::create_mint(store, &self.config, mint, decimals, authority)?;
                Ok((
                    LedgerOutcome::MintCreated { mint, record },
                    LedgerEvent::MintCreated {
                        mint,
                        decimals,
                        authority,
                    },
                ))
            }
            LedgerRequest::CreateAccount { account, owner } => {
                let record = ops::create_bootstrap_account(store, &self.config, account, owner)?;
                Ok(account_created(account, record, InitPolicy::Bootstrap))
            }
            LedgerRequest::CreateZeroedAccount {
                account,
                owner,
                mint,
            } => {
                let record = ops::create_zeroed_account(store, account, owner, mint)?;
                Ok(account_created(account, record, InitPolicy::Zero))
            }
            LedgerRequest::CreateAssociatedAccount { owner, mint } => {
                let (account, record) = ops::create_associated_account(store, owner, mint)?;
                Ok(account_created(account, record, InitPolicy::Zero))
            }
            LedgerRequest::MintTo {
                mint,
                to,
                authority,
                amount,
            } => {
                let minted = ops::mint_to(store, mint, to, authority, amount)?;
                Ok((
                    LedgerOutcome::MintedTo { mint, to, minted },
                    LedgerEvent::MintedTo { mint, to, amount },
                ))
            }
            LedgerRequest::Transfer {
                from,
                to,
                owner,
                amount,
            } => {
                let moved = ops::transfer(store, from, to, owner, amount)?;
                Ok((
                    LedgerOutcome::Transferred { from, to, moved },
                    LedgerEvent::Transferred { from, to, amount },
                ))
            }
        }
    }

    fn seal(
        &mut self,
        request: &LedgerRequest,
        outcome: LedgerOutcome,
        event: LedgerEvent,
    ) -> Receipt {
        let height = self.meta.height + 1;
        let previous = self.meta.last_receipt.unwrap_or([0u8; 32]);
        let commitment = request.commitment();
        let digest = tagged_hash(
            RECEIPT_TAG,
            [&previous[..], &height.to_le_bytes()[..], &commitment[..]],
        );

        self.meta.height = height;
        self.meta.last_receipt = Some(digest);
        self.events.push(event);
        Receipt {
            height,
            digest,
            outcome,
        }
    }

    pub fn state_root(&self) -> [u8; 32] {
        compute_state_root(self.store.records())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let records = self.store.records();
        LedgerSnapshot {
            meta: self.meta.clone(),
            state_root: compute_state_root(records.iter().copied()),
            records: records.into_iter().collect(),
            events: self.events.clone(),
        }
    }

    /// Copy every record of `snapshot` into the backing store in one commit.
    ///
    /// For stores other than [`MemoryStore`]; journal and meta are taken over
    /// from the snapshot.
    pub fn load_snapshot(&mut self, snapshot: LedgerSnapshot) -> Result<(), SnapshotError> {
        snapshot.verify()?;
        let mut writes = WriteSet::new();
        for (id, record) in snapshot.records {
            writes.put(id, record);
        }
        self.store.commit(writes);
        self.meta = snapshot.meta;
        self.events = snapshot.events;
        Ok(())
    }
}

fn account_created(
    account: Identity,
    record: TokenAccount,
    policy: InitPolicy,
) -> (LedgerOutcome, LedgerEvent) {
    (
        LedgerOutcome::AccountCreated { account, record },
        LedgerEvent::AccountCreated {
            account,
            owner: record.owner,
            mint: record.mint,
            balance: record.balance,
            policy,
        },
    )
}

const RECEIPT_TAG: &str = "tledger-receipt";
const EMPTY_ROOT_TAG: &str = "tledger-empty";
const MINT_LEAF_TAG: &str = "tledger-mint";
const ACCOUNT_LEAF_TAG: &str = "tledger-account";
const NODE_TAG: &str = "tledger-node";

/// Sha256 over a length-prefixed `tag` followed by `parts`.
fn tagged_hash<'a>(tag: &str, parts: impl IntoIterator<Item = &'a [u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([tag.len() as u8]);
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn record_leaf(id: &Identity, record: &Record) -> [u8; 32] {
    match record {
        Record::Mint(mint) => {
            let supply = mint.supply.map(u64::to_le_bytes);
            let parts: [&[u8]; 5] = [
                id.as_bytes(),
                &[mint.decimals],
                mint.mint_authority.as_bytes(),
                &[u8::from(supply.is_some())],
                supply.as_ref().map_or(&[][..], |bytes| &bytes[..]),
            ];
            tagged_hash(MINT_LEAF_TAG, parts)
        }
        Record::TokenAccount(account) => {
            let balance = account.balance.to_le_bytes();
            let parts: [&[u8]; 5] = [
                id.as_bytes(),
                account.owner.as_bytes(),
                &balance,
                &[u8::from(account.mint.is_some())],
                account.mint.as_ref().map_or(&[][..], |mint| &mint.as_bytes()[..]),
            ];
            tagged_hash(ACCOUNT_LEAF_TAG, parts)
        }
    }
}

/// Sha256 commitment over records, which must arrive ordered by identity.
///
/// Leaves are hashed pairwise level by level; an unpaired node is carried up
/// unchanged.
pub fn compute_state_root(records: impl IntoIterator<Item = (Identity, Record)>) -> [u8; 32] {
    let mut level: Vec<[u8; 32]> = records
        .into_iter()
        .map(|(id, record)| record_leaf(&id, &record))
        .collect();
    if level.is_empty() {
        return tagged_hash(EMPTY_ROOT_TAG, [] as [&[u8]; 0]);
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => tagged_hash(NODE_TAG, [&left[..], &right[..]]),
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORITY: Identity = Identity::new([0xaa; 32]);
    const MINT: Identity = Identity::new([0x01; 32]);

    fn create_mint() -> LedgerRequest {
        LedgerRequest::CreateMint {
            mint: MINT,
            decimals: 6,
            authority: AUTHORITY,
        }
    }

    #[test]
    fn state_root_is_deterministic() {
        let mut ledger = Ledger::in_memory(LedgerConfig::default());
        ledger.apply(&create_mint()).unwrap();
        let root1 = ledger.snapshot().state_root;
        let root2 = ledger.snapshot().state_root;
        assert_eq!(root1, root2);
        assert_eq!(root1, ledger.state_root());
        assert_ne!(root1, Ledger::in_memory(LedgerConfig::default()).state_root());
    }

    #[test]
    fn receipts_chain_and_failures_leave_no_trace() {
        let mut ledger = Ledger::in_memory(LedgerConfig::default());
        let first = ledger.apply(&create_mint()).unwrap();
        assert_eq!(first.height, 1);
        assert_eq!(ledger.meta().last_receipt, Some(first.digest));

        let root = ledger.state_root();
        let err = ledger.apply(&create_mint()).unwrap_err();
        assert_eq!(err, LedgerError::AlreadyExists { id: MINT });
        assert_eq!(ledger.meta().height, 1);
        assert_eq!(ledger.events().len(), 1);
        assert_eq!(ledger.state_root(), root);

        let second = ledger
            .apply(&LedgerRequest::CreateAssociatedAccount {
                owner: AUTHORITY,
                mint: MINT,
            })
            .unwrap();
        assert_eq!(second.height, 2);
        assert_ne!(second.digest, first.digest);
        match second.outcome {
            LedgerOutcome::AccountCreated { account, record } => {
                assert_eq!(account, Identity::associated_account(&AUTHORITY, &MINT));
                assert_eq!(record.balance, 0);
                assert_eq!(record.mint, Some(MINT));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn snapshot_restores_and_rejects_tampering() {
        let mut ledger = Ledger::in_memory(LedgerConfig::default());
        ledger.apply(&create_mint()).unwrap();
        let snapshot = ledger.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);

        let restored = Ledger::restore(decoded, LedgerConfig::default()).unwrap();
        assert_eq!(restored.state_root(), ledger.state_root());
        assert_eq!(restored.meta(), ledger.meta());
        assert_eq!(restored.mint(&MINT).unwrap().decimals, 6);

        let mut tampered = snapshot.clone();
        if let Some(Record::Mint(mint)) = tampered.records.get_mut(&MINT) {
            mint.decimals = 9;
        }
        assert!(matches!(
            Ledger::restore(tampered, LedgerConfig::default()),
            Err(SnapshotError::RootMismatch { .. })
        ));

        let mut truncated = snapshot;
        truncated.events.clear();
        assert!(matches!(
            truncated.verify(),
            Err(SnapshotError::HeightMismatch { height: 1, events: 0 })
        ));
    }

    #[derive(Default)]
    struct CountingStore {
        records: BTreeMap<Identity, Record>,
        commits: usize,
    }

    impl RecordStore for CountingStore {
        fn get(&self, id: &Identity) -> Option<Record> {
            self.records.get(id).copied()
        }

        fn commit(&mut self, writes: WriteSet) {
            self.commits += 1;
            self.records.extend(writes);
        }

        fn records(&self) -> Vec<(Identity, Record)> {
            self.records.iter().map(|(id, record)| (*id, *record)).collect()
        }
    }

    #[test]
    fn snapshot_loads_into_another_store_in_one_commit() {
        let mut source = Ledger::in_memory(LedgerConfig::default());
        source.apply(&create_mint()).unwrap();
        source
            .apply(&LedgerRequest::CreateAssociatedAccount {
                owner: AUTHORITY,
                mint: MINT,
            })
            .unwrap();
        let snapshot = source.snapshot();

        let mut tampered = snapshot.clone();
        tampered.state_root = [0u8; 32];
        let mut target = Ledger::new(CountingStore::default(), LedgerConfig::default());
        assert!(matches!(
            target.load_snapshot(tampered),
            Err(SnapshotError::RootMismatch { .. })
        ));
        assert_eq!(target.store().commits, 0);
        assert_eq!(target.meta().height, 0);

        target.load_snapshot(snapshot).unwrap();
        assert_eq!(target.store().commits, 1);
        assert_eq!(target.state_root(), source.state_root());
        assert_eq!(target.meta(), source.meta());
        assert_eq!(target.events(), source.events());

        // the loaded journal keeps chaining
        let next = target
            .apply(&LedgerRequest::CreateAccount {
                account: Identity::new([0x0c; 32]),
                owner: AUTHORITY,
            })
            .unwrap();
        assert_eq!(next.height, 3);
        assert_eq!(target.store().commits, 2);
    }

    #[test]
    fn state_root_covers_an_unpaired_last_record() {
        let owner = Identity::new([0x42; 32]);
        let records = |last_balance: u64| {
            (1u8..=3).map(move |n| {
                let balance = if n == 3 { last_balance } else { 1_000 };
                (
                    Identity::new([n; 32]),
                    Record::TokenAccount(TokenAccount {
                        owner,
                        balance,
                        mint: None,
                    }),
                )
            })
        };
        assert_eq!(compute_state_root(records(1_000)), compute_state_root(records(1_000)));
        assert_ne!(compute_state_root(records(1_000)), compute_state_root(records(1_001)));
        assert_ne!(
            compute_state_root(records(1_000).take(2)),
            compute_state_root(records(1_000))
        );
        assert_ne!(
            compute_state_root(records(1_000)),
            compute_state_root(records(1_000).take(0))
        );
    }

    #[test]
    fn requests_are_tagged_by_op() {
        let json = serde_json::to_value(create_mint()).unwrap();
        assert_eq!(json["op"], "create_mint");
        assert_eq!(json["decimals"], 6);
        let back: LedgerRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, create_mint());
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::state::Record;

/// Keyed storage for ledger records.
///
/// Transitions read through [`RecordStore::get`] and hand every write of one
/// operation to a single [`RecordStore::commit`] call, after all of its
/// preconditions have passed. Implementations must apply a write set as a
/// unit: either every record in it becomes visible or none does.
pub trait RecordStore {
    fn get(&self, id: &Identity) -> Option<Record>;

    fn contains(&self, id: &Identity) -> bool {
        self.get(id).is_some()
    }

    fn commit(&mut self, writes: WriteSet);

    /// All records, ordered by identity.
    fn records(&self) -> Vec<(Identity, Record)>;
}

/// Records staged by one transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSet {
    writes: Vec<(Identity, Record)>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `record` at `id`, replacing an earlier write to the same id.
    pub fn put(&mut self, id: Identity, record: impl Into<Record>) {
        let record = record.into();
        match self.writes.iter_mut().find(|(staged, _)| *staged == id) {
            Some(slot) => slot.1 = record,
            None => self.writes.push((id, record)),
        }
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

impl IntoIterator for WriteSet {
    type Item = (Identity, Record);
    type IntoIter = std::vec::IntoIter<(Identity, Record)>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// In-memory [`RecordStore`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryStore {
    records: BTreeMap<Identity, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(Identity, Record)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (Identity, Record)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: &Identity) -> Option<Record> {
        self.records.get(id).copied()
    }

    fn contains(&self, id: &Identity) -> bool {
        self.records.contains_key(id)
    }

    fn commit(&mut self, writes: WriteSet) {
        self.records.extend(writes);
    }

    fn records(&self) -> Vec<(Identity, Record)> {
        self.records.iter().map(|(id, record)| (*id, *record)).collect()
    }
}

use std::collections::btree_map::{self, BTreeMap};

use crate::error::{CodecError, StoreError};
use crate::pubkey::Pubkey;
use crate::state::{ProgramKind, Record};

/// Contents of one occupied slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub program: ProgramKind,
    pub lamports: u64,
    /// Exact codec encoding of the record, no padding.
    pub data: Vec<u8>,
}

impl Account {
    pub fn record(&self) -> Result<Record, CodecError> {
        Record::decode(self.program, &self.data)
    }
}

/// What a write expects to find in the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteIntent {
    /// Slot must be empty.
    Create,
    /// Slot must already hold an account.
    Overwrite,
}

/// Slot-addressed account storage.
///
/// Slots are never evicted or deleted; every mutation goes through
/// [`RecordStore::put`].
pub trait RecordStore {
    fn get(&self, slot: &Pubkey) -> Option<&Account>;

    fn put(&mut self, slot: Pubkey, account: Account, intent: WriteIntent)
        -> Result<(), StoreError>;

    fn exists(&self, slot: &Pubkey) -> bool {
        self.get(slot).is_some()
    }

    fn get_record(&self, slot: &Pubkey) -> Option<Result<Record, CodecError>> {
        self.get(slot).map(Account::record)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    slots: BTreeMap<Pubkey, Account>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Occupied slots in address order.
    pub fn iter(&self) -> btree_map::Iter<'_, Pubkey, Account> {
        self.slots.iter()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, slot: &Pubkey) -> Option<&Account> {
        self.slots.get(slot)
    }

    fn put(
        &mut self,
        slot: Pubkey,
        account: Account,
        intent: WriteIntent,
    ) -> Result<(), StoreError> {
        match (intent, self.slots.entry(slot)) {
            (WriteIntent::Create, btree_map::Entry::Vacant(entry)) => {
                entry.insert(account);
                Ok(())
            }
            (WriteIntent::Create, btree_map::Entry::Occupied(_)) => Err(StoreError::Occupied(slot)),
            (WriteIntent::Overwrite, btree_map::Entry::Occupied(mut entry)) => {
                entry.insert(account);
                Ok(())
            }
            (WriteIntent::Overwrite, btree_map::Entry::Vacant(_)) => Err(StoreError::Vacant(slot)),
        }
    }
}

impl FromIterator<(Pubkey, Account)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (Pubkey, Account)>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use record_program::auth::Proof;
use record_program::processor::{self, Invocation, Outcome, ProgramLog};
use record_program::rent::Rent;
use record_program::store::{Account, MemoryStore, RecordStore};
use record_program::{CodecError, ProgramError, ProgramKind, Pubkey, Record, Request};
use rs_merkle::{algorithms::Sha256 as MerkleSha256, MerkleTree};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub type Lamports = u64;
pub type TxId = [u8; 32];

/// Heights a signed transaction stays valid for after the height named by
/// its nonce. Its id is remembered for exactly that long.
pub const MAX_TRANSACTION_AGE: u64 = 150;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("transaction {} was already processed", hex::encode(.0))]
    DuplicateTransaction(TxId),
    #[error("transaction built at height {nonce} expired; ledger is at height {height}")]
    Expired { nonce: u64, height: u64 },
    #[error("account {0} cannot be both payer and slot")]
    AccountInUse(Pubkey),
    #[error(transparent)]
    Program(#[from] ProgramError),
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("account data for {slot} is not base64: {source}")]
    AccountData {
        slot: Pubkey,
        source: base64::DecodeError,
    },
    #[error(
        "state root mismatch: snapshot says {}, contents hash to {}",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    RootMismatch { expected: [u8; 32], actual: [u8; 32] },
    #[error("rent exemption threshold {0} is not a finite non-negative number")]
    InvalidRent(f64),
}

/// A signed request as submitted to the ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub request: Request,
    pub proofs: Vec<Proof>,
    /// Ledger height the submitter built against. Signed transactions expire
    /// [`MAX_TRANSACTION_AGE`] heights after it.
    pub nonce: u64,
}

impl Transaction {
    pub fn id(&self) -> TxId {
        let mut hasher = Sha256::new();
        hasher.update(b"tx");
        hasher.update(self.request.digest());
        hasher.update(self.nonce.to_le_bytes());
        for proof in &self.proofs {
            hasher.update(proof.identity.as_bytes());
            hasher.update(&proof.signature);
        }
        hasher.finalize().into()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub id: TxId,
    pub height: u64,
    pub program: ProgramKind,
    pub instruction: String,
    pub logs: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerMeta {
    pub height: u64,
    pub last_transaction: Option<TxId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountEntry {
    pub program: ProgramKind,
    pub lamports: Lamports,
    /// Raw record bytes, base64.
    pub data: String,
}

/// A signed transaction still inside its validity window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentTransaction {
    pub id: TxId,
    pub nonce: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    pub meta: LedgerMeta,
    pub rent: Rent,
    pub balances: BTreeMap<Pubkey, Lamports>,
    pub accounts: BTreeMap<Pubkey, AccountEntry>,
    pub recent: Vec<RecentTransaction>,
    pub state_root: [u8; 32],
}

/// Single-process ledger hosting both record programs.
///
/// Transactions run one at a time through `&mut self`, so effects are
/// observed in submission order. A transaction either commits completely
/// (store write, payer debit, height bump) or not at all.
///
/// Only signed transactions are replay-checked. An unsigned request names no
/// submitter, so sending the same one twice is two requests.
#[derive(Debug, Default)]
pub struct LocalLedger {
    meta: LedgerMeta,
    rent: Rent,
    balances: BTreeMap<Pubkey, Lamports>,
    store: MemoryStore,
    /// Signed transaction ids mapped to their nonce, pruned once expired.
    recent: BTreeMap<TxId, u64>,
}

impl LocalLedger {
    pub fn new(rent: Rent) -> Self {
        Self {
            rent,
            ..Self::default()
        }
    }

    pub fn height(&self) -> u64 {
        self.meta.height
    }

    pub fn rent(&self) -> &Rent {
        &self.rent
    }

    pub fn airdrop(&mut self, to: Pubkey, lamports: Lamports) {
        let balance = self.balances.entry(to).or_default();
        *balance = balance.saturating_add(lamports);
        info!(%to, lamports, balance = *balance, "airdrop");
    }

    /// Spendable lamports of a funding identity (not of a record slot).
    pub fn balance(&self, of: &Pubkey) -> Lamports {
        self.balances.get(of).copied().unwrap_or(0)
    }

    pub fn account(&self, slot: &Pubkey) -> Option<&Account> {
        self.store.get(slot)
    }

    /// Direct slot read, the way a client fetches an account after a
    /// transaction confirms.
    pub fn fetch(&self, slot: &Pubkey) -> Option<Result<Record, CodecError>> {
        self.store.get_record(slot)
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn execute(&mut self, tx: &Transaction) -> Result<TransactionReceipt, TransactionError> {
        let id = tx.id();
        let signed = !tx.proofs.is_empty();
        if signed {
            if tx.nonce.saturating_add(MAX_TRANSACTION_AGE) < self.meta.height {
                return Err(TransactionError::Expired {
                    nonce: tx.nonce,
                    height: self.meta.height,
                });
            }
            if self.recent.contains_key(&id) {
                return Err(TransactionError::DuplicateTransaction(id));
            }
        }
        let request = &tx.request;
        if request.payer == Some(request.slot) {
            return Err(TransactionError::AccountInUse(request.slot));
        }

        let payer_lamports = request.payer.map(|p| self.balance(&p)).unwrap_or(0);
        let mut log = ProgramLog::default();
        let outcome = processor::process(
            &mut self.store,
            &self.rent,
            Invocation {
                request,
                proofs: &tx.proofs,
                payer_lamports,
            },
            &mut log,
        )
        .map_err(|err| {
            warn!(tx = %hex::encode(id), error = %err, "transaction rejected");
            err
        })?;

        if let Outcome::Created { payer, lamports, .. } = &outcome {
            // sufficiency was checked by the program against this balance
            let balance = self.balances.entry(*payer).or_default();
            *balance = balance.saturating_sub(*lamports);
        }

        self.meta.height += 1;
        self.meta.last_transaction = Some(id);
        if signed {
            self.recent.insert(id, tx.nonce);
        }
        let height = self.meta.height;
        self.recent
            .retain(|_, nonce| nonce.saturating_add(MAX_TRANSACTION_AGE) >= height);
        debug!(tx = %hex::encode(id), height = self.meta.height, ?outcome, "transaction committed");

        let instruction = record_program::RecordInstruction::unpack(&request.data)
            .map(|ix| ix.name().to_string())
            .unwrap_or_default();
        Ok(TransactionReceipt {
            id,
            height: self.meta.height,
            program: request.program,
            instruction,
            logs: log.into_lines(),
        })
    }

    /// Number of signed transaction ids currently held for replay checks.
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Merkle root over everything a snapshot persists: meta, rent schedule,
    /// recent signed ids, balances and accounts.
    pub fn state_root(&self) -> [u8; 32] {
        let mut leaves: Vec<[u8; 32]> =
            Vec::with_capacity(2 + self.recent.len() + self.balances.len() + self.store.len());

        let mut hasher = Sha256::new();
        hasher.update(b"meta");
        hasher.update(self.meta.height.to_le_bytes());
        match &self.meta.last_transaction {
            Some(id) => {
                hasher.update([1u8]);
                hasher.update(id);
            }
            None => hasher.update([0u8]),
        }
        leaves.push(hasher.finalize().into());

        let mut hasher = Sha256::new();
        hasher.update(b"rent");
        hasher.update(self.rent.lamports_per_byte_year.to_le_bytes());
        hasher.update(self.rent.exemption_threshold.to_bits().to_le_bytes());
        leaves.push(hasher.finalize().into());

        for (id, nonce) in &self.recent {
            let mut hasher = Sha256::new();
            hasher.update(b"recent");
            hasher.update(id);
            hasher.update(nonce.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
        for (key, lamports) in &self.balances {
            let mut hasher = Sha256::new();
            hasher.update(b"bal");
            hasher.update(key.as_bytes());
            hasher.update(lamports.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
        for (slot, account) in self.store.iter() {
            let mut hasher = Sha256::new();
            hasher.update(b"acct");
            hasher.update(slot.as_bytes());
            hasher.update([account.program.tag()]);
            hasher.update(account.lamports.to_le_bytes());
            hasher.update((account.data.len() as u64).to_le_bytes());
            hasher.update(&account.data);
            leaves.push(hasher.finalize().into());
        }
        MerkleTree::<MerkleSha256>::from_leaves(&leaves)
            .root()
            .unwrap_or_else(|| Sha256::digest(b"hello-ledger-empty").into())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            meta: self.meta.clone(),
            rent: self.rent,
            balances: self.balances.clone(),
            accounts: self
                .store
                .iter()
                .map(|(slot, account)| {
                    (
                        *slot,
                        AccountEntry {
                            program: account.program,
                            lamports: account.lamports,
                            data: general_purpose::STANDARD.encode(&account.data),
                        },
                    )
                })
                .collect(),
            recent: self
                .recent
                .iter()
                .map(|(id, nonce)| RecentTransaction {
                    id: *id,
                    nonce: *nonce,
                })
                .collect(),
            state_root: self.state_root(),
        }
    }

    /// Rebuild a ledger, refusing snapshots whose contents do not hash to
    /// their recorded state root.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, SnapshotError> {
        if !snapshot.rent.is_well_formed() {
            return Err(SnapshotError::InvalidRent(snapshot.rent.exemption_threshold));
        }
        let mut accounts = Vec::with_capacity(snapshot.accounts.len());
        for (slot, entry) in snapshot.accounts {
            let data = general_purpose::STANDARD
                .decode(&entry.data)
                .map_err(|source| SnapshotError::AccountData { slot, source })?;
            accounts.push((
                slot,
                Account {
                    program: entry.program,
                    lamports: entry.lamports,
                    data,
                },
            ));
        }
        let ledger = Self {
            meta: snapshot.meta,
            rent: snapshot.rent,
            balances: snapshot.balances,
            store: accounts.into_iter().collect(),
            recent: snapshot
                .recent
                .into_iter()
                .map(|entry| (entry.id, entry.nonce))
                .collect(),
        };
        let actual = ledger.state_root();
        if actual != snapshot.state_root {
            return Err(SnapshotError::RootMismatch {
                expected: snapshot.state_root,
                actual,
            });
        }
        Ok(ledger)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(&self.snapshot())?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = fs::read(path)?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)?;
        Self::from_snapshot(snapshot)
    }
}

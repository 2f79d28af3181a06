//! Host side of the hello-world record programs.
//!
//! * [`ledger`]: a single-process ledger that runs signed transactions
//!   against the programs in `record_program`, holds funding balances and
//!   persists itself as a JSON snapshot.
//! * [`client`]: builds signed transactions the way a wallet-backed client
//!   would.
//! * [`config`]: ledger and CLI settings.
//! * [`telemetry`]: `tracing` subscriber setup.

pub mod client;
pub mod config;
pub mod ledger;
pub mod telemetry;

pub use client::RecordClient;
pub use config::LedgerConfig;
pub use ledger::{LocalLedger, Transaction, TransactionError, TransactionReceipt};

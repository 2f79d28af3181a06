//! Core of the hello-world record programs.
//!
//! Two programs share this crate. The *message* program stores a message
//! together with the identity that created it; the *greeting* program stores
//! a greeting plus a counter bumped on every update. Both are plain state
//! machines over a slot-addressed store:
//!
//! * [`codec`]: deterministic little-endian layout for records and
//!   instruction payloads.
//! * [`state`]: the record types and the program variants owning them.
//! * [`store`]: the slot store contract and its in-memory implementation.
//! * [`auth`]: ed25519 proofs over request digests.
//! * [`rent`]: storage deposit arithmetic for new slots.
//! * [`processor`]: instruction dispatch and the per-instruction handlers.
//!
//! Nothing here performs I/O, spawns threads or takes locks. The host that
//! embeds the processor is expected to serialize requests per slot and to
//! move lamports once a creation succeeds.

pub mod auth;
pub mod codec;
pub mod instruction;
pub mod processor;
pub mod pubkey;
pub mod rent;
pub mod state;
pub mod store;

mod error;

pub use error::{AuthError, CodecError, ParseError, ProgramError, StoreError};
pub use instruction::{RecordInstruction, Request};
pub use pubkey::Pubkey;
pub use state::{GreetingRecord, MessageRecord, ProgramKind, Record};

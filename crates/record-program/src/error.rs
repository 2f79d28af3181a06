use thiserror::Error;

use crate::pubkey::Pubkey;
use crate::state::ProgramKind;

/// Failure to encode or decode a record or instruction payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer ended before a field could be read.
    #[error("buffer truncated at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Bytes were left over after the last field.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// A text field is longer than its layout allows.
    #[error("message of {len} bytes exceeds the {max} byte limit")]
    MessageTooLong { len: usize, max: usize },

    /// A text field is not UTF-8.
    #[error("message is not valid utf-8")]
    InvalidUtf8,

    /// Instruction data was empty.
    #[error("instruction data is empty")]
    EmptyInstruction,

    /// The leading instruction tag is not known to the program.
    #[error("unknown instruction tag {0}")]
    UnknownInstruction(u8),
}

/// A proof did not establish control over the claimed identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("request names no funding account")]
    MissingPayer,

    #[error("no proof supplied for {0}")]
    MissingProof(Pubkey),

    #[error("{0} is not a valid ed25519 public key")]
    MalformedIdentity(Pubkey),

    #[error("malformed signature from {0}")]
    MalformedSignature(Pubkey),

    #[error("invalid signature from {0}")]
    InvalidSignature(Pubkey),
}

/// Write-intent violations raised by a [`crate::store::RecordStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("slot {0} is already occupied")]
    Occupied(Pubkey),

    #[error("slot {0} is empty")]
    Vacant(Pubkey),
}

/// Errors a request can terminate with. None of them leave partial state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("slot {slot} is already initialized")]
    AlreadyInitialized { slot: Pubkey },

    #[error("slot {slot} is not initialized")]
    NotInitialized { slot: Pubkey },

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("insufficient funds for rent: required {required} lamports, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("the {program} program does not support {instruction}")]
    UnsupportedInstruction {
        program: ProgramKind,
        instruction: &'static str,
    },

    #[error("slot {slot} belongs to the {owner} program")]
    ProgramMismatch { slot: Pubkey, owner: ProgramKind },

    #[error("update counter overflow")]
    CounterOverflow,
}

impl From<StoreError> for ProgramError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Occupied(slot) => ProgramError::AlreadyInitialized { slot },
            StoreError::Vacant(slot) => ProgramError::NotInitialized { slot },
        }
    }
}

/// Failure to parse a textual identity or program name.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),

    #[error("unknown program `{0}` (expected `message` or `greeting`)")]
    UnknownProgram(String),
}

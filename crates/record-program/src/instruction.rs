use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{Decoder, Encoder};
use crate::error::CodecError;
use crate::pubkey::Pubkey;
use crate::state::ProgramKind;

pub const INITIALIZE_TAG: u8 = 0;
pub const UPDATE_TAG: u8 = 1;
pub const GET_TAG: u8 = 2;
pub const PING_TAG: u8 = 3;

/// Upper bound for text carried in instruction data. Records enforce their
/// own, tighter limits when the text is stored.
pub const MAX_INSTRUCTION_TEXT: usize = 1024;

const REQUEST_DOMAIN: &[u8] = b"hello-ledger/request/v1";

/// `[tag: u8][args]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordInstruction {
    /// Create the record in an empty slot.
    Initialize { message: String },
    /// Replace the message and bump the counter (greeting program only).
    Update { message: String },
    /// Read-only touch of an existing slot.
    Get,
    /// Log a greeting from the program; touches no slot.
    Ping,
}

impl RecordInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            RecordInstruction::Initialize { .. } => "initialize",
            RecordInstruction::Update { .. } => "update",
            RecordInstruction::Get => "get",
            RecordInstruction::Ping => "ping",
        }
    }

    pub fn pack(&self) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::new();
        match self {
            RecordInstruction::Initialize { message } => {
                enc.put_u8(INITIALIZE_TAG)
                    .put_str(message, MAX_INSTRUCTION_TEXT)?;
            }
            RecordInstruction::Update { message } => {
                enc.put_u8(UPDATE_TAG).put_str(message, MAX_INSTRUCTION_TEXT)?;
            }
            RecordInstruction::Get => {
                enc.put_u8(GET_TAG);
            }
            RecordInstruction::Ping => {
                enc.put_u8(PING_TAG);
            }
        }
        Ok(enc.finish())
    }

    pub fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        if data.is_empty() {
            return Err(CodecError::EmptyInstruction);
        }
        let mut dec = Decoder::new(data);
        let instruction = match dec.u8()? {
            INITIALIZE_TAG => RecordInstruction::Initialize {
                message: dec.string(MAX_INSTRUCTION_TEXT)?,
            },
            UPDATE_TAG => RecordInstruction::Update {
                message: dec.string(MAX_INSTRUCTION_TEXT)?,
            },
            GET_TAG => RecordInstruction::Get,
            PING_TAG => RecordInstruction::Ping,
            other => return Err(CodecError::UnknownInstruction(other)),
        };
        dec.finish()?;
        Ok(instruction)
    }
}

/// A request as the program sees it: instruction data plus the out-of-band
/// account list (target program, slot, optional funding account).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub program: ProgramKind,
    pub slot: Pubkey,
    pub payer: Option<Pubkey>,
    #[serde(with = "crate::auth::serde_hex")]
    pub data: Vec<u8>,
}

impl Request {
    pub fn new(
        program: ProgramKind,
        slot: Pubkey,
        payer: Option<Pubkey>,
        instruction: &RecordInstruction,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            program,
            slot,
            payer,
            data: instruction.pack()?,
        })
    }

    /// The bytes every proof signs. Covers the whole envelope, so a proof
    /// cannot be lifted onto another slot, payer or program.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(REQUEST_DOMAIN);
        hasher.update([self.program.tag()]);
        hasher.update(self.slot.as_bytes());
        match &self.payer {
            Some(payer) => {
                hasher.update([1u8]);
                hasher.update(payer.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update((self.data.len() as u64).to_le_bytes());
        hasher.update(&self.data);
        hasher.finalize().into()
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{string_space, Decoder, Encoder};
use crate::error::{CodecError, ParseError};
use crate::pubkey::{Pubkey, PUBKEY_BYTES};

/// Longest message the message program stores.
pub const MAX_MESSAGE_LEN: usize = 280;
/// Longest greeting the greeting program stores.
pub const MAX_GREETING_LEN: usize = 200;

/// Which program owns a slot, and therefore which record layout it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    Message,
    Greeting,
}

impl ProgramKind {
    pub fn max_message_len(self) -> usize {
        match self {
            ProgramKind::Message => MAX_MESSAGE_LEN,
            ProgramKind::Greeting => MAX_GREETING_LEN,
        }
    }

    /// Bytes reserved for a slot of this program: the encoding of a record
    /// whose message is at the limit. Rent is charged on this, not on the
    /// initial message, so later updates never outgrow the deposit.
    pub fn max_space(self) -> usize {
        match self {
            ProgramKind::Message => MessageRecord::SPACE,
            ProgramKind::Greeting => GreetingRecord::SPACE,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ProgramKind::Message => 0,
            ProgramKind::Greeting => 1,
        }
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramKind::Message => f.write_str("message"),
            ProgramKind::Greeting => f.write_str("greeting"),
        }
    }
}

impl FromStr for ProgramKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" | "hello-world" => Ok(ProgramKind::Message),
            "greeting" => Ok(ProgramKind::Greeting),
            other => Err(ParseError::UnknownProgram(other.to_string())),
        }
    }
}

/// `[message_len: u32][message][sender: 32]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message: String,
    pub sender: Pubkey,
}

impl MessageRecord {
    pub const SPACE: usize = string_space(MAX_MESSAGE_LEN) + PUBKEY_BYTES;

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::with_capacity(string_space(self.message.len()) + PUBKEY_BYTES);
        enc.put_str(&self.message, MAX_MESSAGE_LEN)?
            .put_pubkey(&self.sender);
        Ok(enc.finish())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let message = dec.string(MAX_MESSAGE_LEN)?;
        let sender = dec.pubkey()?;
        dec.finish()?;
        Ok(Self { message, sender })
    }
}

/// `[message_len: u32][message][count: u64]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingRecord {
    pub message: String,
    pub count: u64,
}

impl GreetingRecord {
    pub const SPACE: usize = string_space(MAX_GREETING_LEN) + 8;

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::with_capacity(string_space(self.message.len()) + 8);
        enc.put_str(&self.message, MAX_GREETING_LEN)?
            .put_u64(self.count);
        Ok(enc.finish())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let message = dec.string(MAX_GREETING_LEN)?;
        let count = dec.u64()?;
        dec.finish()?;
        Ok(Self { message, count })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Message(MessageRecord),
    Greeting(GreetingRecord),
}

impl Record {
    pub fn kind(&self) -> ProgramKind {
        match self {
            Record::Message(_) => ProgramKind::Message,
            Record::Greeting(_) => ProgramKind::Greeting,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Record::Message(r) => &r.message,
            Record::Greeting(r) => &r.message,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Record::Message(r) => r.encode(),
            Record::Greeting(r) => r.encode(),
        }
    }

    /// The layout is not self-describing; the owning program picks it.
    pub fn decode(kind: ProgramKind, bytes: &[u8]) -> Result<Self, CodecError> {
        match kind {
            ProgramKind::Message => MessageRecord::decode(bytes).map(Record::Message),
            ProgramKind::Greeting => GreetingRecord::decode(bytes).map(Record::Greeting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Pubkey {
        Pubkey::new([9u8; 32])
    }

    #[test]
    fn message_record_layout() {
        let record = MessageRecord {
            message: "hi".into(),
            sender: sender(),
        };
        let bytes = record.encode().unwrap();
        assert_eq!(&bytes[..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..6], b"hi");
        assert_eq!(&bytes[6..], &[9u8; 32]);
    }

    #[test]
    fn greeting_record_layout() {
        let record = GreetingRecord {
            message: String::new(),
            count: 3,
        };
        let bytes = record.encode().unwrap();
        assert_eq!(bytes, [0, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn records_at_the_limits_survive_decode() {
        let records = [
            Record::Message(MessageRecord {
                message: String::new(),
                sender: sender(),
            }),
            Record::Message(MessageRecord {
                message: "m".repeat(MAX_MESSAGE_LEN),
                sender: sender(),
            }),
            Record::Greeting(GreetingRecord {
                message: "g".repeat(MAX_GREETING_LEN),
                count: u64::MAX,
            }),
            Record::Greeting(GreetingRecord {
                message: "héllo wörld".into(),
                count: 0,
            }),
        ];
        for record in records {
            let bytes = record.encode().unwrap();
            assert_eq!(Record::decode(record.kind(), &bytes).unwrap(), record);
        }
    }

    #[test]
    fn full_size_record_fills_reserved_space() {
        let record = MessageRecord {
            message: "m".repeat(MAX_MESSAGE_LEN),
            sender: sender(),
        };
        assert_eq!(record.encode().unwrap().len(), ProgramKind::Message.max_space());
    }

    #[test]
    fn equal_records_encode_identically() {
        let a = GreetingRecord {
            message: "same".into(),
            count: 11,
        };
        assert_eq!(a.encode().unwrap(), a.clone().encode().unwrap());
    }

    #[test]
    fn oversize_greeting_is_rejected() {
        let record = GreetingRecord {
            message: "x".repeat(MAX_GREETING_LEN + 1),
            count: 0,
        };
        assert_eq!(
            record.encode().unwrap_err(),
            CodecError::MessageTooLong {
                len: MAX_GREETING_LEN + 1,
                max: MAX_GREETING_LEN
            }
        );
    }

    #[test]
    fn truncated_buffers_never_decode() {
        let bytes = GreetingRecord {
            message: "Hello, Solana World!".into(),
            count: 4,
        }
        .encode()
        .unwrap();
        for cut in 0..bytes.len() {
            let err = GreetingRecord::decode(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, CodecError::Truncated { .. }), "cut {cut}: {err}");
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = MessageRecord {
            message: "x".into(),
            sender: sender(),
        }
        .encode()
        .unwrap();
        bytes.push(0);
        assert_eq!(
            MessageRecord::decode(&bytes).unwrap_err(),
            CodecError::TrailingBytes(1)
        );
    }

    #[test]
    fn program_names_parse() {
        assert_eq!("greeting".parse::<ProgramKind>().unwrap(), ProgramKind::Greeting);
        assert_eq!("message".parse::<ProgramKind>().unwrap(), ProgramKind::Message);
        assert!("counter".parse::<ProgramKind>().is_err());
    }
}

//! Fixed-layout binary encoding.
//!
//! Integers are little-endian, text is a `u32` byte length followed by the
//! UTF-8 bytes, identities are 32 raw bytes. There is no padding and no
//! alignment, so equal values always encode to identical bytes. Decoding is
//! strict: a short buffer, trailing bytes, invalid UTF-8 or an over-long text
//! field is an error, never a partial value.

use crate::error::CodecError;
use crate::pubkey::{Pubkey, PUBKEY_BYTES};

/// Bytes taken by the length prefix of a text field.
pub const LEN_PREFIX_BYTES: usize = 4;

/// Encoded size of a text field holding at most `max_len` bytes.
pub const fn string_space(max_len: usize) -> usize {
    LEN_PREFIX_BYTES + max_len
}

#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_pubkey(&mut self, key: &Pubkey) -> &mut Self {
        self.buf.extend_from_slice(key.as_bytes());
        self
    }

    /// Append a length-prefixed string, refusing anything above `max_len`.
    pub fn put_str(&mut self, value: &str, max_len: usize) -> Result<&mut Self, CodecError> {
        let len = value.len();
        if len > max_len {
            return Err(CodecError::MessageTooLong { len, max: max_len });
        }
        let prefix = u32::try_from(len).map_err(|_| CodecError::MessageTooLong {
            len,
            max: u32::MAX as usize,
        })?;
        self.put_u32(prefix);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(self)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub struct Decoder<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let available = self.buf.len() - self.offset;
        if available < needed {
            return Err(CodecError::Truncated {
                offset: self.offset,
                needed,
                available,
            });
        }
        let bytes = &self.buf[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn pubkey(&mut self) -> Result<Pubkey, CodecError> {
        Ok(Pubkey::new(self.take_array::<PUBKEY_BYTES>()?))
    }

    /// Read a length-prefixed string of at most `max_len` bytes.
    ///
    /// The prefix is checked against `max_len` before the body is touched so
    /// a hostile length cannot drive an oversized read.
    pub fn string(&mut self, max_len: usize) -> Result<String, CodecError> {
        let len = self.u32()? as usize;
        if len > max_len {
            return Err(CodecError::MessageTooLong { len, max: max_len });
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}

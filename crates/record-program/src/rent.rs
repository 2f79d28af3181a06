use serde::{Deserialize, Serialize};

use crate::error::ProgramError;

/// Per-account bookkeeping bytes charged on top of the data length.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;
pub const DEFAULT_LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;
pub const DEFAULT_EXEMPTION_THRESHOLD: f64 = 2.0;

/// Storage deposit parameters. A new slot must be funded with
/// `minimum_balance(space)` lamports by whoever creates it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rent {
    pub lamports_per_byte_year: u64,
    pub exemption_threshold: f64,
}

impl Default for Rent {
    fn default() -> Self {
        Self {
            lamports_per_byte_year: DEFAULT_LAMPORTS_PER_BYTE_YEAR,
            exemption_threshold: DEFAULT_EXEMPTION_THRESHOLD,
        }
    }
}

impl Rent {
    /// Rent schedule that charges nothing.
    pub fn free() -> Self {
        Self {
            lamports_per_byte_year: 0,
            ..Self::default()
        }
    }

    /// A negative or NaN threshold would make every deposit zero.
    pub fn is_well_formed(&self) -> bool {
        self.exemption_threshold.is_finite() && self.exemption_threshold >= 0.0
    }

    pub fn minimum_balance(&self, data_len: usize) -> u64 {
        let bytes = ACCOUNT_STORAGE_OVERHEAD.saturating_add(data_len as u64);
        (bytes.saturating_mul(self.lamports_per_byte_year) as f64 * self.exemption_threshold) as u64
    }

    pub fn is_exempt(&self, balance: u64, data_len: usize) -> bool {
        balance >= self.minimum_balance(data_len)
    }

    /// Amount the funder must put down for `data_len` bytes, or
    /// `InsufficientFunds` if `available` does not cover it.
    pub fn check_funding(&self, available: u64, data_len: usize) -> Result<u64, ProgramError> {
        let required = self.minimum_balance(data_len);
        if available < required {
            return Err(ProgramError::InsufficientFunds {
                required,
                available,
            });
        }
        Ok(required)
    }
}

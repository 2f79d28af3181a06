use std::fs;
use std::path::{Path, PathBuf};

use record_program::rent::Rent;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AIRDROP_LAMPORTS: u64 = 1_000_000_000;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(
        "config {}: rent exemption threshold {threshold} must be finite and non-negative",
        .path.display()
    )]
    InvalidRent { path: PathBuf, threshold: f64 },
}

/// Settings for a fresh local ledger and the CLI around it.
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```json
/// { "rent": { "lamports_per_byte_year": 0, "exemption_threshold": 2.0 } }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Rent schedule for ledgers created under this config. A ledger loaded
    /// from a snapshot keeps the schedule it was created with.
    pub rent: Rent,
    /// Lamports credited by `airdrop` when no amount is given.
    pub airdrop_lamports: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rent: Rent::default(),
            airdrop_lamports: DEFAULT_AIRDROP_LAMPORTS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if !config.rent.is_well_formed() {
            return Err(ConfigError::InvalidRent {
                path: path.to_path_buf(),
                threshold: config.rent.exemption_threshold,
            });
        }
        Ok(config)
    }

    /// Defaults unless a path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

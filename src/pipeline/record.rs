//! Persisted enrollment records.
//!
//! Recovery needs the exact addresses drawn at enrollment. The record
//! stores them with the reading size and a BLAKE3 checksum so that a
//! corrupted or hand-edited file is caught before it silently produces a
//! different key. The record holds no key bits.

use crate::extraction::AddressList;
use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current record format version.
pub const RECORD_VERSION: u32 = 1;

/// Domain separator for the record checksum.
const CHECKSUM_DOMAIN: &[u8] = b"puf-keygen-record-v1";

/// Errors that can occur while storing or loading a record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to access record file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to parse record: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u32),
    #[error("record checksum mismatch")]
    ChecksumMismatch,
    #[error("inconsistent record: {0}")]
    Inconsistent(&'static str),
}

/// Addresses and parameters captured at enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub version: u32,
    /// Size in bits of the enrollment reading.
    pub puf_size: usize,
    pub key_length: usize,
    pub allow_duplicates: bool,
    pub enrolled_at: DateTime<Utc>,
    /// Hex-encoded BLAKE3 digest over the fields above and the addresses.
    pub checksum: String,
    pub addresses: AddressList,
}

impl EnrollmentRecord {
    /// Creates a record for addresses sampled over a `puf_size`-bit reading.
    pub fn new(puf_size: usize, addresses: AddressList, allow_duplicates: bool) -> Self {
        let mut record = Self {
            version: RECORD_VERSION,
            puf_size,
            key_length: addresses.len(),
            allow_duplicates,
            enrolled_at: Utc::now(),
            checksum: String::new(),
            addresses,
        };
        record.checksum = record.compute_checksum();
        record
    }

    fn compute_checksum(&self) -> String {
        let mut hasher = Hasher::new();
        hasher.update(CHECKSUM_DOMAIN);
        hasher.update(&self.version.to_le_bytes());
        hasher.update(&(self.puf_size as u64).to_le_bytes());
        hasher.update(&(self.key_length as u64).to_le_bytes());
        hasher.update(&[self.allow_duplicates as u8]);
        for address in self.addresses.iter() {
            hasher.update(&(address as u64).to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Checks version, checksum and internal consistency.
    pub fn verify(&self) -> Result<(), RecordError> {
        if self.version != RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion(self.version));
        }
        if self.compute_checksum() != self.checksum {
            return Err(RecordError::ChecksumMismatch);
        }
        if self.key_length == 0 {
            return Err(RecordError::Inconsistent("key length must be positive"));
        }
        if self.addresses.len() != self.key_length {
            return Err(RecordError::Inconsistent(
                "address count differs from key length",
            ));
        }
        if self.addresses.max_address().is_some_and(|max| max >= self.puf_size) {
            return Err(RecordError::Inconsistent("address beyond recorded PUF size"));
        }
        Ok(())
    }

    /// Encodes the record as TOML.
    pub fn to_toml(&self) -> Result<String, RecordError> {
        Ok(toml::to_string(self)?)
    }

    /// Decodes and verifies a record from TOML.
    pub fn from_toml(content: &str) -> Result<Self, RecordError> {
        let record: EnrollmentRecord = toml::from_str(content)?;
        record.verify()?;
        Ok(record)
    }

    /// Writes the record to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        std::fs::write(path.as_ref(), self.to_toml()?)?;
        tracing::info!(
            path = %path.as_ref().display(),
            key_length = self.key_length,
            "Saved enrollment record"
        );
        Ok(())
    }

    /// Reads and verifies a record from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }
}

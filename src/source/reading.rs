//! Bit source abstraction and file-backed PUF readings.
//!
//! The core never touches files directly. It reads bits through the
//! [`BitSource`] trait so that readings can come from a binary dump on
//! disk, an in-memory fixture or a synthetic generator.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while acquiring a reading.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read PUF dump {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PUF dump {0} is empty")]
    Empty(PathBuf),
}

/// A fixed-length sequence of bits indexable by position.
///
/// Implementations must return the same bit for the same index for
/// their whole lifetime.
pub trait BitSource {
    /// Number of bits available.
    fn len(&self) -> usize;

    /// Returns the bit at `index`, or `None` past the end.
    fn bit_at(&self, index: usize) -> Option<bool>;

    /// Returns true if the source holds no bits.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One physical read of a PUF.
///
/// Stores the raw bytes of the read event and exposes them bit by bit,
/// most significant bit first within each byte.
#[derive(Clone)]
pub struct PufReading {
    /// Raw bytes of the dump.
    data: Vec<u8>,
    /// Where the reading came from, for diagnostics.
    origin: String,
}

impl PufReading {
    /// Wraps bytes already held in memory.
    pub fn from_bytes(data: Vec<u8>, origin: impl Into<String>) -> Self {
        Self {
            data,
            origin: origin.into(),
        }
    }

    /// Reads a whole binary dump into memory.
    ///
    /// The file handle is closed before this returns, on success and on
    /// failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if data.is_empty() {
            return Err(SourceError::Empty(path.to_path_buf()));
        }

        tracing::debug!(
            path = %path.display(),
            bytes = data.len(),
            "Loaded PUF reading"
        );

        Ok(Self {
            data,
            origin: path.display().to_string(),
        })
    }

    /// Returns the raw bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the origin label.
    #[inline]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the number of bits in the reading.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.data.len() * 8
    }
}

impl BitSource for PufReading {
    fn len(&self) -> usize {
        self.bit_count()
    }

    fn bit_at(&self, index: usize) -> Option<bool> {
        let byte = self.data.get(index / 8)?;
        Some((byte >> (7 - index % 8)) & 1 == 1)
    }
}

impl std::fmt::Debug for PufReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PufReading")
            .field("origin", &self.origin)
            .field("bits", &self.bit_count())
            .finish()
    }
}

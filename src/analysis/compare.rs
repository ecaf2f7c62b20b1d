//! Bit-error measurement between two keys.

use crate::source::BitSequence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when comparing keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    #[error("keys must be of the same length: {left} vs {right} bits")]
    LengthMismatch { left: usize, right: usize },
}

/// Result of comparing two equal-length bit sequences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Mismatched bits as a percentage in `[0, 100]`.
    pub error_rate: f64,
    /// Number of mismatched positions.
    pub error_count: usize,
    /// Number of positions compared.
    pub bits_compared: usize,
}

impl ErrorReport {
    /// A report with no errors over `bits_compared` bits.
    pub fn clean(bits_compared: usize) -> Self {
        Self {
            error_rate: 0.0,
            error_count: 0,
            bits_compared,
        }
    }

    /// Returns true if no bits differ.
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.5}% ({} of {} bits)",
            self.error_rate, self.error_count, self.bits_compared
        )
    }
}

/// Computes bit-error rates between keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyComparator;

impl KeyComparator {
    pub fn new() -> Self {
        Self
    }

    /// Counts differing positions and the resulting error rate.
    ///
    /// Sequences of different length are refused rather than compared over
    /// their common prefix.
    pub fn compare(
        &self,
        key1: &BitSequence,
        key2: &BitSequence,
    ) -> Result<ErrorReport, CompareError> {
        if key1.len() != key2.len() {
            return Err(CompareError::LengthMismatch {
                left: key1.len(),
                right: key2.len(),
            });
        }

        let bits_compared = key1.len();
        if bits_compared == 0 {
            return Ok(ErrorReport::clean(0));
        }

        let error_count = key1
            .as_bits()
            .iter()
            .zip(key2.as_bits())
            .filter(|(a, b)| a != b)
            .count();

        Ok(ErrorReport {
            error_rate: 100.0 * error_count as f64 / bits_compared as f64,
            error_count,
            bits_compared,
        })
    }
}

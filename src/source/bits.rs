//! Owned bit sequence type used for keys.

use super::BitSource;

/// An ordered, fixed-length sequence of bits.
///
/// Keys derived from a reading are stored as a `BitSequence`. The
/// sequence is immutable once built; all accessors borrow.
#[derive(Clone, PartialEq, Eq)]
pub struct BitSequence {
    bits: Vec<bool>,
}

impl BitSequence {
    /// Creates a sequence from individual bits.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Unpacks bytes MSB-first, the same order [`PufReading`] uses.
    ///
    /// [`PufReading`]: super::PufReading
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bits = bytes
            .iter()
            .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
            .collect();
        Self { bits }
    }

    /// Returns the bits as a slice.
    #[inline]
    pub fn as_bits(&self) -> &[bool] {
        &self.bits
    }

    /// Returns the number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if the sequence holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns the bit at `index`, if in range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Counts the set bits.
    pub fn popcount(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Packs the bits MSB-first into bytes.
    ///
    /// A trailing partial byte is zero-padded in its low bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, &bit)| acc | ((bit as u8) << (7 - i)))
            })
            .collect()
    }
}

impl BitSource for BitSequence {
    fn len(&self) -> usize {
        self.bits.len()
    }

    fn bit_at(&self, index: usize) -> Option<bool> {
        self.get(index)
    }
}

impl FromIterator<bool> for BitSequence {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Display for BitSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

// Key material: never print the bits through Debug.
impl std::fmt::Debug for BitSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitSequence")
            .field("len", &self.bits.len())
            .finish_non_exhaustive()
    }
}

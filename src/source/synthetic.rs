//! Synthetic PUF for simulation and testing.
//!
//! Produces a device "fingerprint" from a seeded generator and noisy
//! re-reads of it. NOT a source of key material: the output is fully
//! determined by the seed.

use super::PufReading;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

/// Simulated PUF device with a fixed reference pattern.
pub struct SyntheticPuf {
    /// Reference bytes every read is derived from.
    reference: Vec<u8>,
    /// Noise generator for re-reads.
    noise: ChaCha20Rng,
    /// Number of reads performed.
    reads: u64,
}

impl SyntheticPuf {
    /// Creates a device of `size_bytes` bytes from `seed`.
    pub fn new(size_bytes: usize, seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut reference = vec![0u8; size_bytes];
        rng.fill(reference.as_mut_slice());

        Self {
            reference,
            noise: rng,
            reads: 0,
        }
    }

    /// Size of the device in bits.
    pub fn size_bits(&self) -> usize {
        self.reference.len() * 8
    }

    /// Returns the noiseless reference reading.
    pub fn reference(&self) -> PufReading {
        PufReading::from_bytes(self.reference.clone(), "synthetic:reference")
    }

    /// Reads the device, flipping each bit independently with
    /// probability `flip_rate` (clamped to `[0, 1]`).
    pub fn read(&mut self, flip_rate: f64) -> PufReading {
        let flip_rate = if flip_rate.is_nan() {
            0.0
        } else {
            flip_rate.clamp(0.0, 1.0)
        };

        let mut data = self.reference.clone();
        for byte in data.iter_mut() {
            for shift in 0..8 {
                if self.noise.gen_bool(flip_rate) {
                    *byte ^= 1 << shift;
                }
            }
        }

        self.reads += 1;
        PufReading::from_bytes(data, format!("synthetic:read-{}", self.reads))
    }

    /// Returns the number of noisy reads performed.
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

/// Returns a copy of `reading` with the given bit positions inverted.
///
/// Positions past the end are ignored; repeated positions flip twice.
pub fn flip_bits(reading: &PufReading, positions: &[usize]) -> PufReading {
    let mut data = reading.data().to_vec();
    for &pos in positions {
        if let Some(byte) = data.get_mut(pos / 8) {
            *byte ^= 1 << (7 - pos % 8);
        }
    }
    PufReading::from_bytes(data, format!("{}+flipped", reading.origin()))
}

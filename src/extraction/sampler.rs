//! Secure address sampling.
//!
//! Address positions decide which physical bits become key material,
//! so they are drawn from a cryptographically secure generator. The
//! generator is injected; production code uses the OS source.

use rand::Rng;
use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while sampling addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplingError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("cannot draw {key_length} distinct addresses from {puf_size} bits")]
    NotEnoughDistinct { puf_size: usize, key_length: usize },
}

/// Ordered bit positions into a reading.
///
/// Produced once at enrollment and replayed at recovery. The caller owns
/// persistence; see [`EnrollmentRecord`](crate::pipeline::EnrollmentRecord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressList(Vec<usize>);

impl AddressList {
    /// Wraps previously recorded addresses.
    pub fn new(addresses: Vec<usize>) -> Self {
        Self(addresses)
    }

    /// Returns the addresses in order.
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Returns the number of addresses (the key length).
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no addresses.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest address, if any.
    pub fn max_address(&self) -> Option<usize> {
        self.0.iter().copied().max()
    }

    /// Number of distinct positions.
    ///
    /// Lower than [`len`](Self::len) when the sampler drew duplicates,
    /// which means the key carries fewer independent bits.
    pub fn distinct_count(&self) -> usize {
        let mut sorted = self.0.clone();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.len()
    }

    /// Iterates over the addresses.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

/// Draws random positions into a reading.
pub struct AddressSampler<R> {
    rng: R,
    allow_duplicates: bool,
}

impl AddressSampler<OsRng> {
    /// Creates a sampler backed by the operating system's entropy source.
    pub fn from_os_entropy() -> Self {
        Self::new(OsRng)
    }
}

impl<R: RngCore + CryptoRng> AddressSampler<R> {
    /// Creates a sampler over the given secure generator.
    ///
    /// Duplicates are allowed, as in the established enrollment protocol.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            allow_duplicates: true,
        }
    }

    /// Sets whether the same address may be drawn more than once.
    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Returns the duplicate policy.
    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// Draws `key_length` addresses uniformly from `[0, puf_size)`.
    pub fn sample(
        &mut self,
        puf_size: usize,
        key_length: usize,
    ) -> Result<AddressList, SamplingError> {
        if puf_size == 0 {
            return Err(SamplingError::InvalidInput("puf_size must be positive"));
        }
        if key_length == 0 {
            return Err(SamplingError::InvalidInput("key_length must be positive"));
        }

        let addresses: Vec<usize> = if self.allow_duplicates {
            (0..key_length)
                .map(|_| self.rng.gen_range(0..puf_size))
                .collect()
        } else {
            if key_length > puf_size {
                return Err(SamplingError::NotEnoughDistinct {
                    puf_size,
                    key_length,
                });
            }
            rand::seq::index::sample(&mut self.rng, puf_size, key_length).into_vec()
        };

        tracing::debug!(
            puf_size,
            key_length,
            allow_duplicates = self.allow_duplicates,
            "Sampled key addresses"
        );

        Ok(AddressList(addresses))
    }
}

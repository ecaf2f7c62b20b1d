//! Key extraction from a reading at given addresses.

use super::sampler::{AddressList, AddressSampler, SamplingError};
use crate::source::{BitSequence, BitSource};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

/// Errors that can occur during key extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("address {address} out of range for a {len}-bit source")]
    AddressOutOfRange { address: usize, len: usize },
    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// Reads key bits from a [`BitSource`].
///
/// Stateless. The same extractor serves enrollment, where addresses are
/// freshly sampled, and recovery, where recorded addresses are replayed
/// against a later reading.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyExtractor;

impl KeyExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Reads the bit at each address, in order.
    ///
    /// Fails if any address lies outside `source`, which usually means the
    /// addresses were recorded against a differently sized reading.
    pub fn extract<S: BitSource + ?Sized>(
        &self,
        source: &S,
        addresses: &AddressList,
    ) -> Result<BitSequence, ExtractionError> {
        let len = source.len();
        let key = addresses
            .iter()
            .map(|address| {
                source
                    .bit_at(address)
                    .ok_or(ExtractionError::AddressOutOfRange { address, len })
            })
            .collect::<Result<BitSequence, _>>()?;

        tracing::trace!(source_bits = len, key_bits = key.len(), "Extracted key");
        Ok(key)
    }

    /// Samples fresh addresses over `source` and extracts the key.
    ///
    /// Returns the key with the addresses that produced it; the caller must
    /// keep the addresses to recover the key later.
    pub fn enroll<S, R>(
        &self,
        source: &S,
        sampler: &mut AddressSampler<R>,
        key_length: usize,
    ) -> Result<(BitSequence, AddressList), ExtractionError>
    where
        S: BitSource + ?Sized,
        R: RngCore + CryptoRng,
    {
        let addresses = sampler.sample(source.len(), key_length)?;
        let key = self.extract(source, &addresses)?;

        let distinct = addresses.distinct_count();
        if distinct < key_length {
            tracing::debug!(
                key_length,
                distinct,
                "Enrollment drew duplicate addresses"
            );
        }

        Ok((key, addresses))
    }
}

//! Address sampling and key extraction.
//!
//! This module turns a PUF reading into key bits. The [`AddressSampler`]
//! picks which positions of the reading are used, and the [`KeyExtractor`]
//! reads those positions in order, both at enrollment and at recovery.

mod extractor;
mod sampler;

pub use extractor::{ExtractionError, KeyExtractor};
pub use sampler::{AddressList, AddressSampler, SamplingError};

//! PUF readings and bit sequences.
//!
//! This module provides the [`BitSource`] abstraction over a reading,
//! the file-backed [`PufReading`], the owned [`BitSequence`] used for keys
//! and a [`SyntheticPuf`] for simulation. The PUF is treated as a source of
//! raw, noisy bits; nothing here decides which bits become key material.

mod bits;
mod reading;
mod synthetic;

pub use bits::BitSequence;
pub use reading::{BitSource, PufReading, SourceError};
pub use synthetic::{flip_bits, SyntheticPuf};

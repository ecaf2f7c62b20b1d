//! Key comparison and error-rate measurement.
//!
//! Quantifies how far a recovered key has drifted from the enrolled one.
//! The resulting [`ErrorReport`] feeds the reconciliation decision.

mod compare;

pub use compare::{CompareError, ErrorReport, KeyComparator};

//! PUF Key Generation Library
//!
//! Derives a cryptographic key from a Physical Unclonable Function (PUF)
//! reading and reproduces it from later, noisy readings of the same
//! device.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! source → extraction → analysis → reconcile
//!    ↓          ↓           ↓          ↓
//!              pipeline (orchestration)
//! ```
//!
//! # Design Principles
//!
//! - **Secure sampling**: Key addresses come from an injected CSPRNG
//! - **Caller-owned addresses**: The address list is returned, never stored implicitly
//! - **Explicit outcomes**: A noisy key is corrected or rejected, never silently accepted
//! - **Swappable correction**: Correction is a policy trait, not hardcoded
//!
//! # Example
//!
//! ```no_run
//! use puf_keygen::{
//!     source::PufReading,
//!     pipeline::{FileConfig, Pipeline},
//!     reconcile::ReconcileOutcome,
//! };
//!
//! let enroll = PufReading::from_file("enroll/12.bin").unwrap();
//! let later = PufReading::from_file("enroll/500.bin").unwrap();
//!
//! let mut pipeline = Pipeline::from_config(&FileConfig::default()).unwrap();
//! let report = pipeline.run(&enroll, &later).unwrap();
//!
//! println!("Error Rate: {:.5}%", report.reconciliation.report.error_rate);
//! if let ReconcileOutcome::Corrected { post_report, .. } = &report.reconciliation.outcome {
//!     println!("Corrected Key Compared Error Rate: {:.5}%", post_report.error_rate);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod extraction;
pub mod metrics;
pub mod pipeline;
pub mod reconcile;
pub mod source;

// Re-export commonly used types at crate root
pub use analysis::{CompareError, ErrorReport, KeyComparator};
pub use extraction::{AddressList, AddressSampler, ExtractionError, KeyExtractor, SamplingError};
pub use pipeline::{
    Enrollment, EnrollmentRecord, FileConfig, Pipeline, PipelineError, PipelineReport,
    Reconciliation,
};
pub use reconcile::{
    CorrectionPolicy, PreferEnrolled, ReconcileError, ReconcileOutcome, Reconciler,
};
pub use source::{BitSequence, BitSource, PufReading, SourceError, SyntheticPuf};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

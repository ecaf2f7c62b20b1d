//! Prometheus metrics for key enrollment and recovery.
//!
//! # Metrics Exposed
//!
//! ## Enrollment
//! - `puf_keygen_enrollments_total` - Total enrollments
//! - `puf_keygen_duplicate_addresses` - Repeated addresses in the last enrollment
//!
//! ## Recovery
//! - `puf_keygen_recoveries_total` - Total recoveries reconciled
//! - `puf_keygen_corrected_total` - Recoveries corrected
//! - `puf_keygen_rejected_total` - Recoveries rejected
//! - `puf_keygen_last_error_rate` - Error rate of the last recovery (percent)
//! - `puf_keygen_last_error_count` - Mismatched bits in the last recovery
//! - `puf_keygen_error_rate_percent` - Histogram of recovery error rates
//!
//! # Example
//!
//! ```no_run
//! use puf_keygen::{metrics::MetricsRegistry, source::SyntheticPuf, Pipeline, FileConfig};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let mut pipeline = Pipeline::from_config(&FileConfig::default()).unwrap();
//!
//! let mut puf = SyntheticPuf::new(128, 1);
//! let report = pipeline.run(&puf.reference(), &puf.read(0.01)).unwrap();
//!
//! registry.observe_enrollment(&report.enrollment);
//! registry.observe_reconciliation(&report.reconciliation);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry};

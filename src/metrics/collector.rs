//! Metrics collection and registry.

use crate::pipeline::{Enrollment, Reconciliation};
use crate::reconcile::ReconcileOutcome;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder,
};
use thiserror::Error;

/// Bucket bounds, in percent, for the error-rate histogram.
const ERROR_RATE_BUCKETS: &[f64] = &[0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0];

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for key enrollment and recovery.
pub struct MetricsRegistry {
    registry: Registry,

    // Enrollment metrics
    enrollments_total: IntCounter,
    duplicate_addresses: IntGauge,

    // Recovery metrics
    recoveries_total: IntCounter,
    corrected_total: IntCounter,
    rejected_total: IntCounter,
    last_error_rate: Gauge,
    last_error_count: IntGauge,
    error_rate: Histogram,
}

impl MetricsRegistry {
    /// Creates a new registry with all key metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let enrollments_total = IntCounter::new(
            "puf_keygen_enrollments_total",
            "Total number of key enrollments",
        )?;
        let duplicate_addresses = IntGauge::new(
            "puf_keygen_duplicate_addresses",
            "Repeated addresses drawn in the last enrollment",
        )?;

        let recoveries_total = IntCounter::new(
            "puf_keygen_recoveries_total",
            "Total number of key recoveries reconciled",
        )?;
        let corrected_total = IntCounter::new(
            "puf_keygen_corrected_total",
            "Recoveries within threshold and corrected",
        )?;
        let rejected_total = IntCounter::new(
            "puf_keygen_rejected_total",
            "Recoveries rejected for a high error rate",
        )?;
        let last_error_rate = Gauge::new(
            "puf_keygen_last_error_rate",
            "Error rate in percent of the last recovery",
        )?;
        let last_error_count = IntGauge::new(
            "puf_keygen_last_error_count",
            "Mismatched bits in the last recovery",
        )?;
        let error_rate = Histogram::with_opts(
            HistogramOpts::new(
                "puf_keygen_error_rate_percent",
                "Distribution of recovery error rates in percent",
            )
            .buckets(ERROR_RATE_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(enrollments_total.clone()))?;
        registry.register(Box::new(duplicate_addresses.clone()))?;
        registry.register(Box::new(recoveries_total.clone()))?;
        registry.register(Box::new(corrected_total.clone()))?;
        registry.register(Box::new(rejected_total.clone()))?;
        registry.register(Box::new(last_error_rate.clone()))?;
        registry.register(Box::new(last_error_count.clone()))?;
        registry.register(Box::new(error_rate.clone()))?;

        Ok(Self {
            registry,
            enrollments_total,
            duplicate_addresses,
            recoveries_total,
            corrected_total,
            rejected_total,
            last_error_rate,
            last_error_count,
            error_rate,
        })
    }

    /// Records a completed enrollment.
    pub fn observe_enrollment(&self, enrollment: &Enrollment) {
        self.enrollments_total.inc();
        let repeated = enrollment.addresses.len() - enrollment.addresses.distinct_count();
        self.duplicate_addresses.set(repeated as i64);
    }

    /// Records the measurement and decision of one recovery.
    pub fn observe_reconciliation(&self, reconciliation: &Reconciliation) {
        let report = &reconciliation.report;

        self.recoveries_total.inc();
        self.last_error_rate.set(report.error_rate);
        self.last_error_count.set(report.error_count as i64);
        self.error_rate.observe(report.error_rate);

        match reconciliation.outcome {
            ReconcileOutcome::Corrected { .. } => self.corrected_total.inc(),
            ReconcileOutcome::Rejected { .. } => self.rejected_total.inc(),
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ErrorReport;
    use crate::extraction::AddressList;
    use crate::reconcile::RejectReason;
    use crate::source::BitSequence;

    fn report(error_count: usize) -> ErrorReport {
        ErrorReport {
            error_rate: 100.0 * error_count as f64 / 256.0,
            error_count,
            bits_compared: 256,
        }
    }

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_observe_enrollment() {
        let registry = MetricsRegistry::new().unwrap();
        let enrollment = Enrollment {
            key: BitSequence::from_bits(vec![true; 4]),
            addresses: AddressList::new(vec![1, 2, 2, 1]),
            puf_size: 16,
        };

        registry.observe_enrollment(&enrollment);

        let output = registry.encode().unwrap();
        assert!(output.contains("puf_keygen_enrollments_total 1"));
        assert!(output.contains("puf_keygen_duplicate_addresses 2"));
    }

    #[test]
    fn test_observe_outcomes() {
        let registry = MetricsRegistry::new().unwrap();

        registry.observe_reconciliation(&Reconciliation {
            report: report(10),
            outcome: ReconcileOutcome::Corrected {
                key: BitSequence::from_bits(vec![false; 256]),
                observed: report(10),
                post_report: ErrorReport::clean(256),
            },
        });
        registry.observe_reconciliation(&Reconciliation {
            report: report(20),
            outcome: ReconcileOutcome::Rejected {
                reason: RejectReason::ErrorRateTooHigh,
                observed: report(20),
            },
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("puf_keygen_recoveries_total 2"));
        assert!(output.contains("puf_keygen_corrected_total 1"));
        assert!(output.contains("puf_keygen_rejected_total 1"));
        assert!(output.contains("puf_keygen_last_error_count 20"));
        assert!(output.contains("puf_keygen_error_rate_percent_count 2"));
    }
}

//! Enrollment, recovery and reconciliation pipeline.
//!
//! Composes the sampler, extractor and reconciler into the
//! full flow:
//!
//! ```text
//! reading A ─▶ sample + extract ─▶ (key1, addresses)
//! reading B ─▶ extract(addresses) ─▶ key2
//! compare(key1, key2) ─▶ reconcile ─▶ outcome
//! ```
//!
//! Errors from the components propagate unchanged.

mod config;
mod record;

pub use config::{
    ConfigError, EnrollmentConfig, FileConfig, OutputConfig, ReconciliationConfig,
    DEFAULT_KEY_LENGTH,
};
pub use record::{EnrollmentRecord, RecordError, RECORD_VERSION};

use crate::analysis::ErrorReport;
use crate::extraction::{AddressList, AddressSampler, ExtractionError, KeyExtractor};
use crate::reconcile::{
    CorrectionPolicy, PreferEnrolled, ReconcileError, ReconcileOutcome, Reconciler,
};
use crate::source::{BitSequence, BitSource, SourceError};
use rand_core::{CryptoRng, OsRng, RngCore};
use thiserror::Error;

/// Errors that can occur anywhere in the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Output of enrollment.
#[derive(Debug, Clone)]
pub struct Enrollment {
    /// The enrolled key.
    pub key: BitSequence,
    /// Addresses the key was read from. Must be kept for recovery.
    pub addresses: AddressList,
    /// Size in bits of the enrollment reading.
    pub puf_size: usize,
}

impl Enrollment {
    /// Builds a persistable record of this enrollment.
    pub fn to_record(&self, allow_duplicates: bool) -> EnrollmentRecord {
        EnrollmentRecord::new(self.puf_size, self.addresses.clone(), allow_duplicates)
    }
}

/// Error measurement and decision for one recovered key.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Enrolled key compared against the recovered key.
    pub report: ErrorReport,
    pub outcome: ReconcileOutcome,
}

/// Result of a full enroll-and-recover run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub enrollment: Enrollment,
    pub reconciliation: Reconciliation,
}

/// Key derivation pipeline over an injected secure generator.
pub struct Pipeline<R = OsRng, P = PreferEnrolled> {
    key_length: usize,
    sampler: AddressSampler<R>,
    extractor: KeyExtractor,
    reconciler: Reconciler<P>,
}

impl Pipeline {
    /// Builds a production pipeline from configuration.
    pub fn from_config(config: &FileConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let sampler = AddressSampler::from_os_entropy()
            .allow_duplicates(config.enrollment.allow_duplicates);
        let reconciler = Reconciler::with_threshold(config.reconciliation.threshold_pct)?;
        Ok(Self::new(sampler, reconciler, config.enrollment.key_length))
    }
}

impl<R, P> Pipeline<R, P>
where
    R: RngCore + CryptoRng,
    P: CorrectionPolicy,
{
    /// Assembles a pipeline from its parts.
    pub fn new(
        sampler: AddressSampler<R>,
        reconciler: Reconciler<P>,
        key_length: usize,
    ) -> Self {
        Self {
            key_length,
            sampler,
            extractor: KeyExtractor::new(),
            reconciler,
        }
    }

    /// Key length in bits.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Returns the reconciler.
    pub fn reconciler(&self) -> &Reconciler<P> {
        &self.reconciler
    }

    /// Samples addresses over `reading` and extracts the enrolled key.
    pub fn enroll<S: BitSource + ?Sized>(
        &mut self,
        reading: &S,
    ) -> Result<Enrollment, PipelineError> {
        let (key, addresses) = self
            .extractor
            .enroll(reading, &mut self.sampler, self.key_length)?;

        tracing::info!(
            puf_bits = reading.len(),
            key_length = key.len(),
            distinct_addresses = addresses.distinct_count(),
            "Enrolled key"
        );

        Ok(Enrollment {
            key,
            addresses,
            puf_size: reading.len(),
        })
    }

    /// Replays recorded addresses against a later reading.
    pub fn recover<S: BitSource + ?Sized>(
        &self,
        reading: &S,
        addresses: &AddressList,
    ) -> Result<BitSequence, PipelineError> {
        Ok(self.extractor.extract(reading, addresses)?)
    }

    /// Measures and reconciles a recovered key against the enrolled one.
    pub fn reconcile(
        &self,
        enrolled: &BitSequence,
        recovered: &BitSequence,
    ) -> Result<Reconciliation, PipelineError> {
        let outcome = self.reconciler.reconcile(enrolled, recovered)?;
        let report = *outcome.observed();
        tracing::info!(
            error_rate = report.error_rate,
            error_count = report.error_count,
            "Measured key error rate"
        );

        Ok(Reconciliation { report, outcome })
    }

    /// Runs the whole flow on an enrollment and a recovery reading.
    pub fn run<A, B>(
        &mut self,
        enroll_reading: &A,
        recover_reading: &B,
    ) -> Result<PipelineReport, PipelineError>
    where
        A: BitSource + ?Sized,
        B: BitSource + ?Sized,
    {
        let enrollment = self.enroll(enroll_reading)?;
        let recovered = self.recover(recover_reading, &enrollment.addresses)?;
        let reconciliation = self.reconcile(&enrollment.key, &recovered)?;

        Ok(PipelineReport {
            enrollment,
            reconciliation,
        })
    }

    /// Recovers with a stored record, re-deriving the enrolled key from the
    /// reference reading instead of storing it.
    pub fn recover_with_record<A, B>(
        &self,
        record: &EnrollmentRecord,
        reference: &A,
        reading: &B,
    ) -> Result<Reconciliation, PipelineError>
    where
        A: BitSource + ?Sized,
        B: BitSource + ?Sized,
    {
        record.verify()?;
        for len in [reference.len(), reading.len()] {
            if len != record.puf_size {
                tracing::warn!(
                    reading_bits = len,
                    recorded_bits = record.puf_size,
                    "Reading size differs from enrollment"
                );
            }
        }

        let enrolled = self.recover(reference, &record.addresses)?;
        let recovered = self.recover(reading, &record.addresses)?;
        self.reconcile(&enrolled, &recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{flip_bits, PufReading, SyntheticPuf};
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    fn seeded_pipeline(seed: u64, allow_duplicates: bool) -> Pipeline<ChaCha20Rng> {
        let sampler = AddressSampler::new(ChaCha20Rng::seed_from_u64(seed))
            .allow_duplicates(allow_duplicates);
        Pipeline::new(sampler, Reconciler::new(), 256)
    }

    /// Flips the reading at the addresses of the first `count` key bits.
    fn perturb(reading: &PufReading, addresses: &AddressList, count: usize) -> PufReading {
        let positions: Vec<usize> = addresses.iter().take(count).collect();
        flip_bits(reading, &positions)
    }

    #[test]
    fn test_ten_errors_are_corrected() {
        let reading_a = SyntheticPuf::new(128, 11).reference();
        let mut pipeline = seeded_pipeline(1, false);

        let enrollment = pipeline.enroll(&reading_a).unwrap();
        assert_eq!(enrollment.puf_size, 1024);

        let reading_b = perturb(&reading_a, &enrollment.addresses, 10);
        let recovered = pipeline.recover(&reading_b, &enrollment.addresses).unwrap();
        let result = pipeline.reconcile(&enrollment.key, &recovered).unwrap();

        assert_eq!(result.report.error_count, 10);
        assert!((result.report.error_rate - 3.90625).abs() < 1e-9);
        assert_eq!(
            result.outcome,
            ReconcileOutcome::Corrected {
                key: enrollment.key.clone(),
                observed: result.report,
                post_report: ErrorReport::clean(256),
            }
        );
    }

    #[test]
    fn test_twenty_errors_are_rejected() {
        let reading_a = SyntheticPuf::new(128, 11).reference();
        let mut pipeline = seeded_pipeline(2, false);

        let enrollment = pipeline.enroll(&reading_a).unwrap();
        let reading_b = perturb(&reading_a, &enrollment.addresses, 20);
        let recovered = pipeline.recover(&reading_b, &enrollment.addresses).unwrap();
        let result = pipeline.reconcile(&enrollment.key, &recovered).unwrap();

        assert_eq!(result.report.error_count, 20);
        assert!((result.report.error_rate - 7.8125).abs() < 1e-9);
        assert!(matches!(
            result.outcome,
            ReconcileOutcome::Rejected { observed, .. } if observed == result.report
        ));
    }

    #[test]
    fn test_run_with_identical_readings() {
        let reading = SyntheticPuf::new(64, 3).reference();
        let report = seeded_pipeline(4, true).run(&reading, &reading).unwrap();

        assert!(report.reconciliation.report.is_clean());
        assert!(report.reconciliation.outcome.is_corrected());
        assert_eq!(report.enrollment.addresses.len(), 256);
    }

    #[test]
    fn test_duplicates_count_each_key_bit() {
        let reading_a = PufReading::from_bytes(vec![0u8; 2], "small");
        let mut pipeline = seeded_pipeline(5, true);

        // 256 draws over 16 bits: every position repeats.
        let enrollment = pipeline.enroll(&reading_a).unwrap();
        let flipped_address = enrollment.addresses.as_slice()[0];
        let reading_b = flip_bits(&reading_a, &[flipped_address]);

        let recovered = pipeline.recover(&reading_b, &enrollment.addresses).unwrap();
        let result = pipeline.reconcile(&enrollment.key, &recovered).unwrap();

        let expected = enrollment
            .addresses
            .iter()
            .filter(|&a| a == flipped_address)
            .count();
        assert_eq!(result.report.error_count, expected);
    }

    #[test]
    fn test_recovery_against_smaller_reading_fails() {
        let reading_a = SyntheticPuf::new(128, 1).reference();
        let reading_b = PufReading::from_bytes(vec![0u8; 4], "short");
        let mut pipeline = seeded_pipeline(6, true);

        let result = pipeline.run(&reading_a, &reading_b);
        assert!(matches!(
            result,
            Err(PipelineError::Extraction(
                ExtractionError::AddressOutOfRange { .. }
            ))
        ));
    }

    #[test]
    fn test_zero_key_length_is_invalid_input() {
        let sampler = AddressSampler::new(ChaCha20Rng::seed_from_u64(0));
        let mut pipeline = Pipeline::new(sampler, Reconciler::new(), 0);
        let reading = SyntheticPuf::new(16, 0).reference();

        assert!(matches!(
            pipeline.enroll(&reading),
            Err(PipelineError::Extraction(ExtractionError::Sampling(
                crate::extraction::SamplingError::InvalidInput(_)
            )))
        ));
    }

    #[test]
    fn test_recover_with_record() {
        let mut puf = SyntheticPuf::new(128, 21);
        let reference = puf.reference();
        let mut pipeline = seeded_pipeline(7, true);

        let enrollment = pipeline.enroll(&reference).unwrap();
        let record = enrollment.to_record(true);

        let noisy = puf.read(0.0);
        let result = pipeline
            .recover_with_record(&record, &reference, &noisy)
            .unwrap();
        assert_eq!(result.outcome.key(), Some(&enrollment.key));
    }

    #[test]
    fn test_recover_with_tampered_record() {
        let reference = SyntheticPuf::new(128, 21).reference();
        let mut pipeline = seeded_pipeline(8, true);

        let mut record = pipeline.enroll(&reference).unwrap().to_record(true);
        record.puf_size += 8;

        assert!(matches!(
            pipeline.recover_with_record(&record, &reference, &reference),
            Err(PipelineError::Record(RecordError::ChecksumMismatch))
        ));
    }

    #[test]
    fn test_empty_record_does_not_match_any_device() {
        let reference = SyntheticPuf::new(128, 1).reference();
        let foreign = SyntheticPuf::new(128, 999).reference();
        let record = EnrollmentRecord::new(1024, AddressList::new(vec![]), true);

        assert!(matches!(
            seeded_pipeline(9, true).recover_with_record(&record, &reference, &foreign),
            Err(PipelineError::Record(RecordError::Inconsistent(_)))
        ));
    }

    #[test]
    fn test_reconcile_length_mismatch() {
        let pipeline = seeded_pipeline(10, true);
        let a = BitSequence::from_bits(vec![true; 8]);
        let b = BitSequence::from_bits(vec![true; 9]);

        assert!(matches!(
            pipeline.reconcile(&a, &b),
            Err(PipelineError::Reconcile(ReconcileError::Compare(_)))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = FileConfig::from_toml(
            "[enrollment]\nkey_length = 64\n[reconciliation]\nthreshold_pct = 1.0\n",
        )
        .unwrap();
        let pipeline = Pipeline::from_config(&config).unwrap();

        assert_eq!(pipeline.key_length(), 64);
        assert_eq!(pipeline.reconciler().threshold_pct(), 1.0);
    }
}

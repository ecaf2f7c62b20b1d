//! Threshold-driven reconciliation of an enrolled and a recovered key.
//!
//! Each call walks a small state machine:
//!
//! ```text
//! Measuring ──(rate > threshold)──▶ Rejected
//!     │
//!     └──(rate <= threshold)──▶ Correcting ──▶ Corrected
//! ```
//!
//! Nothing carries over between calls.

use super::policy::{CorrectionPolicy, PreferEnrolled};
use crate::analysis::{CompareError, ErrorReport, KeyComparator};
use crate::source::BitSequence;
use thiserror::Error;

/// Default maximum error rate, in percent, that is still corrected.
pub const DEFAULT_THRESHOLD_PCT: f64 = 5.0;

/// Errors that can occur during reconciliation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("threshold {0} is not a percentage in [0, 100]")]
    InvalidThreshold(f64),
    #[error(transparent)]
    Compare(#[from] CompareError),
}

/// Reconciliation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// Measuring the error rate between the keys.
    Measuring,
    /// Applying the correction policy.
    Correcting,
    /// Terminal: a corrected key was produced.
    Corrected,
    /// Terminal: the error rate was too high.
    Rejected,
}

/// Why a key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ErrorRateTooHigh,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::ErrorRateTooHigh => f.write_str("error_rate_too_high"),
        }
    }
}

/// Result of a reconciliation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The key was within tolerance and corrected.
    Corrected {
        /// The corrected key.
        key: BitSequence,
        /// Enrolled key compared against the recovered key.
        observed: ErrorReport,
        /// Enrolled key compared against the corrected key.
        post_report: ErrorReport,
    },
    /// The key was too noisy to correct.
    Rejected {
        reason: RejectReason,
        /// Enrolled key compared against the recovered key.
        observed: ErrorReport,
    },
}

impl ReconcileOutcome {
    /// Returns true for [`ReconcileOutcome::Corrected`].
    pub fn is_corrected(&self) -> bool {
        matches!(self, ReconcileOutcome::Corrected { .. })
    }

    /// The corrected key, if any.
    pub fn key(&self) -> Option<&BitSequence> {
        match self {
            ReconcileOutcome::Corrected { key, .. } => Some(key),
            ReconcileOutcome::Rejected { .. } => None,
        }
    }

    /// Enrolled key compared against the recovered key, before correction.
    pub fn observed(&self) -> &ErrorReport {
        match self {
            ReconcileOutcome::Corrected { observed, .. }
            | ReconcileOutcome::Rejected { observed, .. } => observed,
        }
    }

    /// The terminal state this outcome represents.
    pub fn state(&self) -> ReconcileState {
        match self {
            ReconcileOutcome::Corrected { .. } => ReconcileState::Corrected,
            ReconcileOutcome::Rejected { .. } => ReconcileState::Rejected,
        }
    }
}

/// Decides whether a recovered key is usable and corrects it.
pub struct Reconciler<P = PreferEnrolled> {
    threshold_pct: f64,
    comparator: KeyComparator,
    policy: P,
}

impl Reconciler {
    /// Creates a reconciler with the default threshold and policy.
    pub fn new() -> Self {
        Self {
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            comparator: KeyComparator::new(),
            policy: PreferEnrolled,
        }
    }

    /// Creates a reconciler with a custom threshold and the default policy.
    pub fn with_threshold(threshold_pct: f64) -> Result<Self, ReconcileError> {
        Self::with_policy(threshold_pct, PreferEnrolled)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: CorrectionPolicy> Reconciler<P> {
    /// Creates a reconciler with a custom threshold and policy.
    pub fn with_policy(threshold_pct: f64, policy: P) -> Result<Self, ReconcileError> {
        if !(0.0..=100.0).contains(&threshold_pct) {
            return Err(ReconcileError::InvalidThreshold(threshold_pct));
        }
        Ok(Self {
            threshold_pct,
            comparator: KeyComparator::new(),
            policy,
        })
    }

    /// Returns the threshold in percent.
    pub fn threshold_pct(&self) -> f64 {
        self.threshold_pct
    }

    /// Returns the correction policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Measures the error rate and corrects the key if it is tolerable.
    pub fn reconcile(
        &self,
        enrolled: &BitSequence,
        recovered: &BitSequence,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut state = ReconcileState::Measuring;
        let observed = self.comparator.compare(enrolled, recovered)?;

        if observed.error_rate > self.threshold_pct {
            state = transition(state, ReconcileState::Rejected);
            tracing::warn!(
                error_rate = observed.error_rate,
                error_count = observed.error_count,
                threshold = self.threshold_pct,
                ?state,
                "Error rate too high, key could not be corrected"
            );
            return Ok(ReconcileOutcome::Rejected {
                reason: RejectReason::ErrorRateTooHigh,
                observed,
            });
        }

        state = transition(state, ReconcileState::Correcting);
        let key = self.policy.correct(enrolled, recovered);
        let post_report = self.comparator.compare(enrolled, &key)?;
        state = transition(state, ReconcileState::Corrected);

        tracing::info!(
            policy = self.policy.name(),
            errors_before = observed.error_count,
            errors_after = post_report.error_count,
            ?state,
            "Key corrected"
        );

        Ok(ReconcileOutcome::Corrected {
            key,
            observed,
            post_report,
        })
    }
}

fn transition(from: ReconcileState, to: ReconcileState) -> ReconcileState {
    tracing::trace!(?from, ?to, "Reconciler state change");
    to
}

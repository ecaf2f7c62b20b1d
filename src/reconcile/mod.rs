//! Reconciliation of noisy recovered keys.
//!
//! Compares a recovered key against the enrolled one and either rejects it
//! or runs it through a [`CorrectionPolicy`]. The policy is a trait so that
//! a real error-correcting scheme can replace the default
//! [`PreferEnrolled`] behaviour without touching the decision logic.

mod policy;
mod reconciler;

pub use policy::{CorrectionPolicy, PreferEnrolled};
pub use reconciler::{
    ReconcileError, ReconcileOutcome, ReconcileState, Reconciler, RejectReason,
    DEFAULT_THRESHOLD_PCT,
};

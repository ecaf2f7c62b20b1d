//! Correction policies applied once a key is within tolerance.

use crate::source::BitSequence;

/// Combines an enrolled key and a recovered key into a corrected key.
///
/// Called only with keys of equal length that the reconciler has already
/// accepted. Implementations must return a key of that same length.
pub trait CorrectionPolicy {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Produces the corrected key.
    fn correct(&self, enrolled: &BitSequence, recovered: &BitSequence) -> BitSequence;
}

/// Resolves every disagreement in favour of the enrolled key.
///
/// Agreeing bits are kept and disagreeing bits take the enrolled value,
/// so the output always equals `enrolled`. It does not correct anything
/// in the coding-theory sense: under this policy the recovered key only
/// gates acceptance.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferEnrolled;

impl CorrectionPolicy for PreferEnrolled {
    fn name(&self) -> &'static str {
        "prefer-enrolled"
    }

    fn correct(&self, enrolled: &BitSequence, recovered: &BitSequence) -> BitSequence {
        enrolled
            .as_bits()
            .iter()
            .zip(recovered.as_bits())
            .map(|(&e, &r)| if e == r { r } else { e })
            .collect()
    }
}

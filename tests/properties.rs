//! Property tests for sampling, extraction, comparison and reconciliation.

use proptest::prelude::*;
use puf_keygen::{
    AddressList, AddressSampler, BitSequence, BitSource, CompareError, ErrorReport,
    KeyComparator, KeyExtractor, PufReading, ReconcileOutcome, Reconciler,
};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

fn bit_vec(len: impl Into<prop::collection::SizeRange>) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), len)
}

/// Two keys of the same length.
fn key_pair() -> impl Strategy<Value = (BitSequence, BitSequence)> {
    (1usize..512).prop_flat_map(|len| {
        (bit_vec(len), bit_vec(len))
            .prop_map(|(a, b)| (BitSequence::from_bits(a), BitSequence::from_bits(b)))
    })
}

proptest! {
    #[test]
    fn sampled_addresses_in_range(
        seed in any::<u64>(),
        puf_size in 1usize..10_000,
        key_length in 1usize..1024,
    ) {
        let mut sampler = AddressSampler::new(ChaCha20Rng::seed_from_u64(seed));
        let addresses = sampler.sample(puf_size, key_length).unwrap();

        prop_assert_eq!(addresses.len(), key_length);
        prop_assert!(addresses.iter().all(|a| a < puf_size));
    }

    #[test]
    fn distinct_sampling_has_no_repeats(
        seed in any::<u64>(),
        puf_size in 1usize..4096,
        fraction in 0.0f64..=1.0,
    ) {
        let key_length = ((puf_size as f64 * fraction) as usize).max(1);
        let mut sampler = AddressSampler::new(ChaCha20Rng::seed_from_u64(seed))
            .allow_duplicates(false);
        let addresses = sampler.sample(puf_size, key_length).unwrap();

        prop_assert_eq!(addresses.distinct_count(), key_length);
    }

    #[test]
    fn extraction_reads_each_address(
        data in prop::collection::vec(any::<u8>(), 1..256),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..300),
    ) {
        let reading = PufReading::from_bytes(data, "prop");
        let addresses = AddressList::new(picks.iter().map(|i| i.index(reading.len())).collect());

        let extractor = KeyExtractor::new();
        let key = extractor.extract(&reading, &addresses).unwrap();

        prop_assert_eq!(key.len(), addresses.len());
        for (i, address) in addresses.iter().enumerate() {
            prop_assert_eq!(key.get(i), reading.bit_at(address));
        }
        prop_assert_eq!(extractor.extract(&reading, &addresses).unwrap(), key);
    }

    #[test]
    fn compare_is_reflexive(bits in bit_vec(1..512)) {
        let key = BitSequence::from_bits(bits);
        let report = KeyComparator::new().compare(&key, &key).unwrap();
        prop_assert_eq!(report, ErrorReport::clean(key.len()));
    }

    #[test]
    fn compare_is_symmetric_and_bounded((a, b) in key_pair()) {
        let comparator = KeyComparator::new();
        let ab = comparator.compare(&a, &b).unwrap();
        let ba = comparator.compare(&b, &a).unwrap();

        prop_assert_eq!(ab.error_count, ba.error_count);
        prop_assert!((0.0..=100.0).contains(&ab.error_rate));
    }

    #[test]
    fn compare_refuses_length_mismatch(a in bit_vec(0..64), b in bit_vec(0..64)) {
        prop_assume!(a.len() != b.len());
        let result = KeyComparator::new()
            .compare(&BitSequence::from_bits(a), &BitSequence::from_bits(b));
        let is_length_mismatch = matches!(result, Err(CompareError::LengthMismatch { .. }));
        prop_assert!(is_length_mismatch);
    }

    #[test]
    fn reconcile_follows_threshold((a, b) in key_pair(), threshold in 0.0f64..=100.0) {
        let reconciler = Reconciler::with_threshold(threshold).unwrap();
        let observed = KeyComparator::new().compare(&a, &b).unwrap();

        match reconciler.reconcile(&a, &b).unwrap() {
            ReconcileOutcome::Corrected { key, observed: measured, post_report } => {
                prop_assert!(observed.error_rate <= threshold);
                prop_assert_eq!(measured, observed);
                prop_assert_eq!(&key, &a);
                prop_assert_eq!(post_report, ErrorReport::clean(a.len()));
            }
            ReconcileOutcome::Rejected { observed: rejected, .. } => {
                prop_assert!(observed.error_rate > threshold);
                prop_assert_eq!(rejected, observed);
            }
        }
    }
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use puf_keygen::{
    AddressSampler, KeyComparator, KeyExtractor, Pipeline, Reconciler, SyntheticPuf,
};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

fn bench_sampling(c: &mut Criterion) {
    let mut sampler = AddressSampler::new(ChaCha20Rng::seed_from_u64(1));
    c.bench_function("sample_256_of_8192", |b| {
        b.iter(|| sampler.sample(black_box(8192), black_box(256)).unwrap())
    });

    let mut distinct = AddressSampler::new(ChaCha20Rng::seed_from_u64(1)).allow_duplicates(false);
    c.bench_function("sample_distinct_256_of_8192", |b| {
        b.iter(|| distinct.sample(black_box(8192), black_box(256)).unwrap())
    });
}

fn bench_extract_and_compare(c: &mut Criterion) {
    let mut puf = SyntheticPuf::new(1024, 7);
    let reference = puf.reference();
    let noisy = puf.read(0.03);

    let addresses = AddressSampler::new(ChaCha20Rng::seed_from_u64(2))
        .sample(puf.size_bits(), 256)
        .unwrap();
    let extractor = KeyExtractor::new();
    let key1 = extractor.extract(&reference, &addresses).unwrap();
    let key2 = extractor.extract(&noisy, &addresses).unwrap();

    c.bench_function("extract_256", |b| {
        b.iter(|| extractor.extract(black_box(&noisy), &addresses).unwrap())
    });

    let comparator = KeyComparator::new();
    c.bench_function("compare_256", |b| {
        b.iter(|| comparator.compare(black_box(&key1), black_box(&key2)).unwrap())
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let mut puf = SyntheticPuf::new(1024, 9);
    let reference = puf.reference();
    let noisy = puf.read(0.03);

    let sampler = AddressSampler::new(ChaCha20Rng::seed_from_u64(3));
    let mut pipeline = Pipeline::new(sampler, Reconciler::new(), 256);

    c.bench_function("pipeline_run_8192_bits", |b| {
        b.iter(|| pipeline.run(black_box(&reference), black_box(&noisy)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_sampling,
    bench_extract_and_compare,
    bench_pipeline
);
criterion_main!(benches);

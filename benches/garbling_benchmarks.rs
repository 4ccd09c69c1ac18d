use bio_auth_mpc::distance::{BioCircuitBuilder, BioCircuitConfig, DistanceFunction};
use bio_auth_mpc::garbling::{evaluate, garble};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{thread_rng, Rng};

fn bench_garble_hamming(c: &mut Criterion) {
    let config = BioCircuitConfig::new(8, 8, DistanceFunction::Hamming);
    let circuit = BioCircuitBuilder::build(config).unwrap();

    c.bench_function("garble_hamming_8x8", |b| {
        b.iter(|| garble(&circuit, &mut thread_rng()).unwrap())
    });
}

fn bench_evaluate_hamming(c: &mut Criterion) {
    let config = BioCircuitConfig::new(8, 8, DistanceFunction::Hamming);
    let circuit = BioCircuitBuilder::build(config).unwrap();
    let garbling = garble(&circuit, &mut thread_rng()).unwrap();
    let inputs: Vec<bool> = (0..circuit.n).map(|_| thread_rng().gen()).collect();
    let labels = garbling.extract_labels(&inputs).unwrap();

    c.bench_function("evaluate_hamming_8x8", |b| {
        b.iter(|| evaluate(&circuit, &garbling.tables, &labels).unwrap())
    });
}

fn bench_build_cosine(c: &mut Criterion) {
    c.bench_function("build_cosine_4x8", |b| {
        b.iter(|| {
            let config = BioCircuitConfig::new(4, 8, DistanceFunction::Cosine);
            BioCircuitBuilder::build(config).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_garble_hamming,
    bench_evaluate_hamming,
    bench_build_cosine
);
criterion_main!(benches);

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use temperpool::alphabet;
use temperpool::corpus::CountMatrix;
use temperpool::kernel::{CipherModel, IsingModel, Lattice};

fn bench_log_target(c: &mut Criterion) {
    let text = "the quick brown fox jumps over the lazy dog. ".repeat(200);
    let reference = CountMatrix::from_text(&text, alphabet::ALPHABET_SIZE);
    let coded = Arc::new(CountMatrix::from_text(&text[..1000], alphabet::ALPHABET_SIZE));
    let model = CipherModel::new(&reference, coded);

    let mut rng = fastrand::Rng::with_seed(1);
    let key = alphabet::random_key(alphabet::ALPHABET_SIZE, &mut rng);

    c.bench_function("log_target_95", |b| {
        b.iter(|| model.log_target(std::hint::black_box(&key), 1.0))
    });
}

fn bench_gibbs_sweep(c: &mut Criterion) {
    let model = IsingModel::new(64, 4).unwrap();
    let mut rng = fastrand::Rng::with_seed(2);
    let lat = Lattice::random(64, &mut rng);

    c.bench_function("gibbs_sweep_64", |b| {
        b.iter(|| model.gibbs_sweeps(&lat, 1, 0.4, &mut rng).unwrap())
    });
}

criterion_group!(benches, bench_log_target, bench_gibbs_sweep);
criterion_main!(benches);

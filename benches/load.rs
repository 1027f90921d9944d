use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use rand::{rngs::SmallRng, Rng, SeedableRng};

use scapegoat_index::Scapegoat;

const BENCH_SEED: u128 = 0x1471_8089_0990_8695_8970_0000_0000_0001;
const N: usize = 10_000;

// Trial values of the balancing factor for load-testing tree operations.
const BALANCES: [usize; 6] = [0, 50, 100, 250, 500, 1000];

fn random_keys(n: usize) -> Vec<i64> {
    let mut rng = SmallRng::from_seed(BENCH_SEED.to_le_bytes());
    (0..n).map(|_| (rng.gen::<u64>() % (1 << 31)) as i64).collect()
}

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn bench_insert_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("insert_random");
    for balance in BALANCES.iter() {
        group.bench_function(BenchmarkId::from_parameter(balance), |b| {
            b.iter(|| {
                let mut tree: Scapegoat<i64, i64> =
                    Scapegoat::new("bench", *balance).unwrap();
                for key in keys.iter() {
                    tree.insert(*key, *key);
                }
                tree
            });
        });
    }
    group.finish();
}

fn bench_insert_ordered(c: &mut Criterion) {
    let keys = ordered_keys(N);
    let mut group = c.benchmark_group("insert_ordered");
    for balance in BALANCES.iter() {
        group.bench_function(BenchmarkId::from_parameter(balance), |b| {
            b.iter(|| {
                let mut tree: Scapegoat<i64, i64> =
                    Scapegoat::new("bench", *balance).unwrap();
                for key in keys.iter() {
                    tree.insert(*key, *key);
                }
                tree
            });
        });
    }
    group.finish();
}

fn bench_load_from(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("load_from");
    for balance in BALANCES.iter() {
        group.bench_function(BenchmarkId::from_parameter(balance), |b| {
            b.iter(|| {
                let entries = keys.iter().map(|k| (*k, *k));
                let tree: Scapegoat<i64, i64> =
                    Scapegoat::load_from("bench", *balance, entries).unwrap();
                tree
            });
        });
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("get");
    for balance in BALANCES.iter() {
        let entries = keys.iter().map(|k| (*k, *k));
        let tree: Scapegoat<i64, i64> =
            Scapegoat::load_from("bench", *balance, entries).unwrap();
        group.bench_function(BenchmarkId::from_parameter(balance), |b| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % keys.len();
                tree.get(&keys[i])
            });
        });
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("remove");
    for balance in BALANCES.iter() {
        group.bench_function(BenchmarkId::from_parameter(balance), |b| {
            b.iter(|| {
                let entries = keys.iter().map(|k| (*k, *k));
                let mut tree: Scapegoat<i64, i64> =
                    Scapegoat::load_from("bench", *balance, entries).unwrap();
                for key in keys.iter() {
                    tree.remove(key);
                }
                tree
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random,
    bench_insert_ordered,
    bench_load_from,
    bench_get,
    bench_remove
);
criterion_main!(benches);

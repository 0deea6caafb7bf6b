//! Criterion benchmarks for icell-forest: forest training and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use icell_forest::{TrainingDataset, TrainingParameters};

/// `n_samples` pixels with `n_features` filter responses; the first three
/// channels carry the class, the rest are noise.
fn make_pixels(n_samples: usize, n_features: usize, n_classes: u32, seed: u64) -> TrainingDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ds = TrainingDataset::with_features(n_features).unwrap();
    let mut row = vec![0.0f32; n_features];
    for i in 0..n_samples {
        let class = i as u32 % n_classes;
        for (f, v) in row.iter_mut().enumerate() {
            let base = if f < 3 { class as f32 * 3.0 } else { 0.0 };
            *v = base + rng.r#gen::<f32>() * 4.0;
        }
        ds.push(&row, class + 1).unwrap();
    }
    ds
}

fn bench_train(c: &mut Criterion) {
    let ds = make_pixels(2000, 20, 4, 42);
    let params = TrainingParameters::new().with_tree_num(50).with_seed(42);

    c.bench_function("train_2000x20_4class_50trees", |b| {
        b.iter(|| params.fit(&ds).unwrap());
    });
}

fn bench_train_single_tree(c: &mut Criterion) {
    let ds = make_pixels(2000, 20, 4, 42);
    let params = TrainingParameters::new()
        .with_tree_num(1)
        .with_candidate_classifier_threshold_num(100)
        .with_seed(42);

    c.bench_function("single_tree_2000x20_100thresholds", |b| {
        b.iter(|| params.fit(&ds).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let ds = make_pixels(2000, 20, 4, 42);
    let forest = TrainingParameters::new()
        .with_tree_num(50)
        .with_seed(42)
        .fit(&ds)
        .unwrap()
        .into_forest();
    let samples: Vec<Vec<f32>> = ds.rows().map(<[f32]>::to_vec).collect();

    c.bench_function("predict_batch_2000x20_50trees", |b| {
        b.iter(|| forest.predict_batch(&samples).unwrap());
    });
}

criterion_group!(benches, bench_train, bench_train_single_tree, bench_predict_batch);
criterion_main!(benches);

//! End-to-end properties of training, prediction and persistence.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use icell_forest::{DecisionForest, ForestError, TrainingDataset, TrainingParameters};

// ---------------------------------------------------------------------------
// Helpers: deterministic synthetic datasets
// ---------------------------------------------------------------------------

/// 2 features, labels 1 / 2 split exactly by `feature[0] <= 5`.
fn separable_by_five() -> TrainingDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut ds = TrainingDataset::with_features(2).unwrap();
    for i in 0..100 {
        let x0 = (i % 11) as f32 + rng.gen_range(-0.4..0.4f32);
        let x1 = rng.gen_range(0.0..10.0f32);
        ds.push(&[x0, x1], if x0 <= 5.0 { 1 } else { 2 }).unwrap();
    }
    ds
}

/// 300 samples, 6 features, 3 classes with overlapping noise.
fn noisy_three_class() -> TrainingDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut ds = TrainingDataset::with_features(6).unwrap();
    for i in 0..300u32 {
        let class = i % 3;
        let row: Vec<f32> = (0..6)
            .map(|f| {
                let base = if f < 2 { class as f32 } else { 0.0 };
                base + rng.r#gen::<f32>() * 1.5
            })
            .collect();
        ds.push(&row, 100 + class).unwrap();
    }
    ds
}

fn probe_vectors(n_features: usize, count: usize) -> Vec<Vec<f32>> {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    (0..count)
        .map(|_| (0..n_features).map(|_| rng.gen_range(-1.0..12.0f32)).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn linearly_separable_reaches_full_training_accuracy() {
    let ds = separable_by_five();
    for (tree_depth, tree_num) in [(1, 1), (1, 5), (4, 10)] {
        let result = TrainingParameters::new()
            .with_tree_depth(tree_depth)
            .with_tree_num(tree_num)
            .with_candidate_node_classifier_num(2)
            .with_candidate_classifier_threshold_num(1000)
            .fit(&ds)
            .unwrap();
        let accuracy = result.forest().evaluate(&ds).unwrap().accuracy();
        assert!(
            (accuracy - 1.0).abs() < f64::EPSILON,
            "depth {tree_depth}, trees {tree_num}: accuracy = {accuracy}"
        );
    }
}

#[test]
fn single_label_fails_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forest.bin");
    let ds = TrainingDataset::new(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], &[3, 3, 3])
        .unwrap();

    let outcome = TrainingParameters::new()
        .fit(&ds)
        .and_then(|result| result.forest().save(&path));

    assert!(matches!(
        outcome,
        Err(ForestError::InsufficientLabelDiversity { n_distinct: 1 })
    ));
    assert!(!path.exists());
}

#[test]
fn write_read_preserves_labels_and_aggregate_histograms() {
    let ds = noisy_three_class();
    let forest = TrainingParameters::new()
        .with_tree_num(15)
        .with_sub_sample_percent(0.6)
        .fit(&ds)
        .unwrap()
        .into_forest();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forest.bin");
    forest.save(&path).unwrap();
    let restored = DecisionForest::load(&path).unwrap();

    let mut buffer = Vec::new();
    forest.write_to(&mut buffer).unwrap();
    let streamed = DecisionForest::read_from(buffer.as_slice()).unwrap();

    let mut samples = probe_vectors(6, 200);
    samples.extend(ds.rows().map(<[f32]>::to_vec));
    for sample in &samples {
        let label = forest.predict(sample).unwrap();
        let aggregate = forest.aggregate_histogram(sample).unwrap();
        for other in [&restored, &streamed] {
            assert_eq!(other.predict(sample).unwrap(), label);
            assert_eq!(other.aggregate_histogram(sample).unwrap(), aggregate);
            assert_eq!(
                other.predict_distribution(sample).unwrap(),
                forest.predict_distribution(sample).unwrap()
            );
        }
    }
}

#[test]
fn predict_is_deterministic() {
    let ds = noisy_three_class();
    let forest = TrainingParameters::new()
        .with_tree_num(10)
        .fit(&ds)
        .unwrap()
        .into_forest();
    for sample in probe_vectors(6, 50) {
        assert_eq!(forest.predict(&sample).unwrap(), forest.predict(&sample).unwrap());
    }
}

#[test]
fn training_accuracy_never_drops_with_depth() {
    let ds = noisy_three_class();
    let mut previous = 0.0;
    for tree_depth in 1..=12 {
        let accuracy = TrainingParameters::new()
            .with_tree_depth(tree_depth)
            .with_tree_num(1)
            .with_seed(5)
            .fit(&ds)
            .unwrap()
            .forest()
            .evaluate(&ds)
            .unwrap()
            .accuracy();
        assert!(
            accuracy >= previous,
            "depth {tree_depth}: accuracy {accuracy} < {previous}"
        );
        previous = accuracy;
    }
}

#[test]
fn same_seed_same_forest() {
    let ds = noisy_three_class();
    let params = TrainingParameters::new()
        .with_tree_num(6)
        .with_sub_sample_percent(0.5)
        .with_seed(2024);
    let a = params.fit(&ds).unwrap().into_forest();
    let b = params.fit(&ds).unwrap().into_forest();
    assert_eq!(a, b);

    let c = params.clone().with_seed(2025).fit(&ds).unwrap().into_forest();
    assert_ne!(a, c);
}

#[test]
fn label_map_is_stable_and_returned() {
    let ds = noisy_three_class();
    let (forest, label_map) = TrainingParameters::new()
        .with_tree_num(3)
        .fit(&ds)
        .unwrap()
        .into_parts();
    assert_eq!(label_map.labels(), &[100, 101, 102]);
    assert_eq!(forest.label_map(), &label_map);
    for sample in probe_vectors(6, 20) {
        let label = forest.predict(&sample).unwrap();
        assert!(label_map.index_of(label).is_some());
    }
}

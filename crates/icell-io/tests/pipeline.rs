//! End-to-end integration tests: images -> sample -> train -> save/load -> apply -> image.

use std::fs;
use std::path::{Path, PathBuf};

use icell_forest::{DecisionForest, TrainingParameters};
use icell_io::{
    SampleTableReader, apply_forest, read_feature_stack, read_label_mask, sample_training_set,
    write_label_image,
};
use image::{ImageBuffer, Luma};
use tempfile::TempDir;

const WIDTH: u32 = 16;
const HEIGHT: u32 = 12;

/// Three vertical bands: dark (class 1), mid (class 2), bright (class 3).
fn band_class(x: u32) -> u32 {
    match x {
        0..=4 => 1,
        5..=10 => 2,
        _ => 3,
    }
}

fn write_gray8(path: &Path, f: impl Fn(u32, u32) -> u8) {
    ImageBuffer::<Luma<u8>, _>::from_fn(WIDTH, HEIGHT, |x, y| Luma([f(x, y)]))
        .save(path)
        .unwrap();
}

/// Two feature channels plus a sparse scribble mask labelling rows 0 and 6.
fn write_fixture(dir: &Path) -> (Vec<PathBuf>, PathBuf) {
    let intensity = dir.join("intensity.png");
    let noise = dir.join("noise.png");
    let mask = dir.join("mask.png");

    write_gray8(&intensity, |x, y| (band_class(x) * 60 + (x + y) % 7) as u8);
    write_gray8(&noise, |x, y| ((x * 31 + y * 17) % 255) as u8);
    write_gray8(&mask, |x, y| if y % 6 == 0 { band_class(x) as u8 } else { 0 });

    (vec![intensity, noise], mask)
}

#[test]
fn image_round_trip() {
    let dir = TempDir::new().unwrap();
    let (feature_paths, mask_path) = write_fixture(dir.path());

    // 1. Read inputs and sample labelled pixels
    let stack = read_feature_stack(&feature_paths).unwrap();
    let mask = read_label_mask(&mask_path).unwrap();
    assert_eq!(mask.n_labelled(), 2 * WIDTH as usize);

    let dataset = sample_training_set(&stack, &mask).unwrap();
    assert_eq!(dataset.n_samples(), 2 * WIDTH as usize);
    assert_eq!(dataset.n_features(), 2);
    assert_eq!(dataset.distinct_labels(), vec![1, 2, 3]);

    // 2. Train and persist
    let result = TrainingParameters::new()
        .with_tree_num(10)
        .with_tree_depth(6)
        .with_candidate_node_classifier_num(2)
        .with_candidate_classifier_threshold_num(100)
        .with_seed(3)
        .fit(&dataset)
        .unwrap();
    let forest_path = dir.path().join("model.icrf");
    result.forest().save(&forest_path).unwrap();
    let forest = DecisionForest::load(&forest_path).unwrap();
    assert_eq!(&forest, result.forest());

    // 3. Classify the whole image and write it back out
    let classified = apply_forest(&forest, &stack).unwrap();
    let out_path = dir.path().join("classified.png");
    write_label_image(&classified, &out_path).unwrap();

    // 4. Read back and check the bands were recovered everywhere
    let reread = read_label_mask(&out_path).unwrap();
    assert_eq!(reread.labels(), classified.labels());
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            assert_eq!(classified.get(x, y), band_class(x), "pixel ({x}, {y})");
        }
    }
    let counts = classified.label_counts();
    assert_eq!(counts, vec![(1, 5 * 12), (2, 6 * 12), (3, 5 * 12)]);
}

#[test]
fn csv_table_trains_same_shape_forest() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("samples.csv");
    let mut content = String::from("label,f0,f1\n");
    for i in 0..40 {
        let label = if i < 20 { 7 } else { 9 };
        content.push_str(&format!("{label},{},{}\n", i as f32 * 0.5, (i * 13 % 11) as f32));
    }
    fs::write(&csv_path, content).unwrap();

    let dataset = SampleTableReader::new(&csv_path).read().unwrap();
    let result = TrainingParameters::new()
        .with_tree_num(3)
        .with_candidate_node_classifier_num(2)
        .with_candidate_classifier_threshold_num(100)
        .fit(&dataset)
        .unwrap();
    let forest = result.forest();

    assert_eq!(forest.n_features(), 2);
    assert_eq!(forest.label_map().labels(), &[7, 9]);
    assert_eq!(forest.evaluate(&dataset).unwrap().accuracy(), 1.0);
    assert_eq!(forest.predict(&[0.0, 3.0]).unwrap(), 7);
    assert_eq!(forest.predict(&[19.5, 3.0]).unwrap(), 9);
}

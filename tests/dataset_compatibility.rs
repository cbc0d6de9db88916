//! Dataset compatibility and format validation tests
//!
//! Tests for ensuring LibSVM inputs, with and without unlabeled rows, work
//! correctly across the pipeline

use rsvmlin::utils::{self, stats::matrix_stats};
use rsvmlin::{api::SSL, Algorithm, Dataset, LibSVMDataset};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(data: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    write!(temp_file, "{data}").expect("Failed to write");
    temp_file.flush().expect("Failed to flush");
    temp_file
}

/// Test LibSVM format variations
#[test]
fn test_libsvm_format_variations() {
    let test_cases = vec![
        // Basic format
        ("+1 1:0.5 3:1.2 7:0.8\n-1 2:0.3 5:2.1\n", "basic format"),
        // With comments and empty lines
        (
            "# This is a comment\n+1 1:0.5 3:1.2\n\n# Another comment\n-1 2:0.3\n",
            "with comments",
        ),
        // Different label formats
        ("1 1:0.5 2:1.0\n-1 1:-0.5 2:-1.0\n", "explicit +/-1 labels"),
        // Sparse indices (non-consecutive)
        (
            "+1 1:1.0 10:2.0 100:3.0\n-1 5:1.5 50:2.5 500:3.5\n",
            "sparse indices",
        ),
        // Single feature
        (
            "+1 1:2.0\n-1 1:-2.0\n+1 1:1.8\n-1 1:-1.8\n",
            "single feature",
        ),
        // Many features
        (
            "+1 1:0.1 2:0.2 3:0.3 4:0.4 5:0.5\n-1 1:-0.1 2:-0.2 3:-0.3 4:-0.4 5:-0.5\n",
            "many features",
        ),
    ];

    for (data, description) in test_cases {
        let temp_file = write_temp(data);

        let dataset = LibSVMDataset::from_file(temp_file.path())
            .unwrap_or_else(|e| panic!("Failed to load LibSVM dataset ({description}): {e}"));

        assert!(
            dataset.len() >= 2,
            "Dataset should have at least 2 samples: {description}"
        );
        assert!(
            dataset.dim() > 0,
            "Dataset should have dimensions: {description}"
        );

        let model = SSL::new()
            .with_lambda(0.01)
            .train(&dataset)
            .unwrap_or_else(|e| panic!("Training should succeed for {description}: {e}"));

        let prediction = model.predict(&dataset.get_sample(0));
        assert!(
            prediction.label == 1.0 || prediction.label == -1.0,
            "Prediction should be binary for: {description}"
        );
        assert_eq!(model.evaluate(&dataset), 1.0, "{description}");
    }
}

/// Unlabeled rows mixed into the same file
#[test]
fn test_unlabeled_rows() {
    let data = "+1 1:1.0 2:0.2\n0 1:0.9 2:0.1\n-1 1:-1.0 2:-0.1\n0 1:-1.1\n0.0 2:0.3\n";
    let temp_file = write_temp(data);

    let dataset = LibSVMDataset::from_file(temp_file.path()).expect("Failed to load dataset");
    assert_eq!(dataset.len(), 5);
    assert_eq!(utils::validation::label_counts(&dataset), (1, 1, 3));
    assert!(dataset.get_sample(1).is_unlabeled());
    assert!(dataset.get_sample(4).is_unlabeled());

    let matrix = dataset.to_design_matrix().expect("valid matrix");
    assert_eq!(matrix.l(), 2);
    assert_eq!(matrix.u(), 3);
    assert_eq!(matrix.unlabeled_indices(), vec![1, 3, 4]);

    for algorithm in [Algorithm::Tsvm, Algorithm::DaS3vm] {
        let model = SSL::new()
            .with_algorithm(algorithm)
            .with_lambda(0.01)
            .train(&dataset)
            .unwrap_or_else(|e| panic!("{algorithm:?} should train: {e}"));
        // Only the two labeled rows are scored
        let metrics = model.evaluate_detailed(&dataset);
        assert_eq!(metrics.true_positives + metrics.false_negatives, 1);
        assert_eq!(metrics.true_negatives + metrics.false_positives, 1);
    }
}

/// Test large dimension handling
#[test]
fn test_large_dimensions() {
    let mut libsvm_data = String::new();

    // Positive samples with features at high indices
    libsvm_data.push_str("+1 100:1.0 1000:2.0 10000:1.5\n");
    libsvm_data.push_str("+1 150:1.2 1500:1.8 15000:1.3\n");

    // Negative samples
    libsvm_data.push_str("-1 200:1.0 2000:2.0 20000:1.5\n");
    libsvm_data.push_str("-1 250:1.2 2500:1.8 25000:1.3\n");

    // Unlabeled samples sharing features with each side
    libsvm_data.push_str("0 100:0.9 1000:1.9\n");
    libsvm_data.push_str("0 200:1.1 2000:1.7\n");

    let temp_file = write_temp(&libsvm_data);

    let dataset = LibSVMDataset::from_file(temp_file.path())
        .expect("Failed to load high-dimensional dataset");

    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.dim(), 25000); // Max index was 24999 (0-based), so dim is 25000

    let start = std::time::Instant::now();
    let model = SSL::new()
        .with_algorithm(Algorithm::Tsvm)
        .with_lambda(0.01)
        .train(&dataset)
        .expect("Training on high-dimensional data should succeed");
    let duration = start.elapsed();

    assert!(
        duration.as_secs() < 5,
        "High-dimensional training should be fast due to sparsity"
    );

    assert_eq!(model.inner().feature_weights().len(), 25000);
    assert_eq!(model.evaluate(&dataset), 1.0);
    let predictions = model.predict_dataset(&dataset);
    assert_eq!(predictions[4].label, 1.0);
    assert_eq!(predictions[5].label, -1.0);
}

/// Test malformed data handling
#[test]
fn test_malformed_data_handling() {
    let malformed_cases = vec![
        ("invalid_label 1:1.0\n", "invalid label"),
        ("+1 invalid_feature\n", "invalid feature format"),
        ("+1 0:1.0\n", "zero-based index"),
        ("+1 1:invalid_value\n", "invalid feature value"),
        ("+1 x:1.0\n", "invalid feature index"),
        ("", "empty file"),
        ("# only a comment\n\n", "comments only"),
    ];

    for (data, description) in malformed_cases {
        let temp_file = write_temp(data);
        let result = LibSVMDataset::from_file(temp_file.path());
        assert!(
            result.is_err(),
            "LibSVM should reject malformed data: {description}"
        );
    }
}

/// Test dataset statistics and validation
#[test]
fn test_dataset_validation() {
    let data = "+1 1:3.0 2:4.0\n+1 1:2.8 2:4.2\n+1 1:3.2\n\
                -1 1:-3.0 2:-4.0\n-1 1:-2.8 2:-4.2\n0 1:-3.2 2:-3.8\n";
    let temp_file = write_temp(data);

    let dataset = LibSVMDataset::from_file(temp_file.path()).expect("Failed to load dataset");
    let matrix = dataset.to_design_matrix().expect("valid matrix");

    assert!(utils::validation::validate_labels(&matrix, Algorithm::L2Svm).is_ok());
    assert!(utils::validation::validate_labels(&matrix, Algorithm::Tsvm).is_ok());

    let (pos_count, neg_count, unlabeled_count) = utils::validation::label_counts(&dataset);
    assert_eq!(pos_count, 3, "Should have 3 positive samples");
    assert_eq!(neg_count, 2, "Should have 2 negative samples");
    assert_eq!(unlabeled_count, 1, "Should have 1 unlabeled sample");

    let stats = matrix_stats(&matrix);
    assert_eq!(stats.rows, 6);
    assert_eq!(stats.features, 2);
    assert_eq!(stats.labeled, 5);
    assert_eq!(stats.unlabeled, 1);
    assert_eq!(stats.nnz, 11);
    assert_eq!(stats.min_nnz, 1);
    assert_eq!(stats.max_nnz, 2);
    assert!((stats.density - 11.0 / 12.0).abs() < 1e-12);

    // Regression targets are only valid for least squares
    let regression = write_temp("2.5 1:1.0\n-0.5 1:0.5\n");
    let dataset = LibSVMDataset::from_file(regression.path()).expect("Failed to load dataset");
    let matrix = dataset.to_design_matrix().expect("valid matrix");
    assert!(utils::validation::validate_labels(&matrix, Algorithm::L2Svm).is_err());
    assert!(
        utils::validation::validate_labels(&matrix, Algorithm::RegularizedLeastSquares).is_ok()
    );
}

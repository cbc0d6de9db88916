//! Core traits for the linear SSL solvers

use crate::core::{Prediction, Sample, SparseVector};

/// Dataset abstraction for row access
pub trait Dataset: Send + Sync {
    /// Number of rows in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality, without bias)
    fn dim(&self) -> usize;

    /// Get a single row by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn get_sample(&self, i: usize) -> Sample;

    /// Get all labels as a vector (0 marks unlabeled rows)
    fn get_labels(&self) -> Vec<f64>;

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows carrying the unlabeled sentinel
    fn n_unlabeled(&self) -> usize {
        self.get_labels().iter().filter(|&&y| y == 0.0).count()
    }
}

/// Per-row regression target and cost seen by the least squares solver
///
/// The design matrix implements this with its own label and cost columns;
/// weighted solvers supply effective targets without touching the matrix.
pub trait TargetSource {
    /// Target value y_i of row `row`
    fn label(&self, row: usize) -> f64;

    /// Cost weight C_i of row `row`
    fn cost(&self, row: usize) -> f64;
}

/// Trained linear decision function
pub trait LinearModel: Send + Sync {
    /// Full weight vector, bias weight last when present
    fn weights(&self) -> &[f64];

    /// Raw decision value w·x (+ bias)
    fn decision_value(&self, features: &SparseVector) -> f64;

    /// Predict a single sample
    fn predict(&self, sample: &Sample) -> Prediction {
        let decision_value = self.decision_value(&sample.features);
        let label = if decision_value >= 0.0 { 1.0 } else { -1.0 };
        Prediction::new(label, decision_value)
    }

    /// Predict multiple samples
    fn predict_batch(&self, samples: &[Sample]) -> Vec<Prediction> {
        samples.iter().map(|s| self.predict(s)).collect()
    }
}

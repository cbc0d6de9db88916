//! High-level API for semi-supervised linear SVM training
//!
//! This module provides a builder-style interface for training, prediction
//! and evaluation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rsvmlin::api::SSL;
//! use rsvmlin::core::Algorithm;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Rows labeled 0 in the file are treated as unlabeled
//! let model = SSL::new()
//!     .with_algorithm(Algorithm::Tsvm)
//!     .with_lambda(0.01)
//!     .with_lambda_u(1.0)
//!     .with_positive_fraction(0.5)
//!     .train_from_file("train.libsvm")?;
//!
//! let predictions = model.predict_from_file("test.libsvm")?;
//! println!("Accuracy: {:.2}%", model.evaluate_from_file("test.libsvm")? * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    Algorithm, Dataset, LinearModel, OptimizerConfig, Prediction, Result, SSLError, Sample,
    TrainingOutcome,
};
use crate::data::LibSVMDataset;
use crate::optimizer::{SSLOptimizer, TrainedLinearModel};
use crate::utils::norm_square;
use std::path::Path;

/// Semi-supervised linear SVM with builder pattern
#[derive(Debug, Clone, Default)]
pub struct SSL {
    config: OptimizerConfig,
}

impl SSL {
    /// Create a new trainer with default parameters (supervised L2-SVM)
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Set regularization on the weights
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.lambda = lambda;
        self
    }

    /// Set the weight of the unlabeled loss
    pub fn with_lambda_u(mut self, lambda_u: f64) -> Self {
        self.config.lambda_u = lambda_u;
        self
    }

    /// Set the expected fraction of positives among unlabeled rows
    pub fn with_positive_fraction(mut self, r: f64) -> Self {
        self.config.r = r;
        self
    }

    /// Set the maximum number of label switches per TSVM pass
    pub fn with_max_switches(mut self, s: usize) -> Self {
        self.config.s = s;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set the constant bias feature (0 disables the bias)
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.config.bias = bias;
        self
    }

    /// Set the CG and finite Newton iteration limits
    pub fn with_iteration_limits(mut self, cg_iter_max: usize, mfn_iter_max: usize) -> Self {
        self.config.cg_iter_max = cg_iter_max;
        self.config.mfn_iter_max = mfn_iter_max;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Train on a dataset
    pub fn train<D: Dataset>(self, dataset: &D) -> Result<TrainedModel> {
        let model = SSLOptimizer::new(self.config).train(dataset)?;
        Ok(TrainedModel { model })
    }

    /// Train on samples
    pub fn train_samples(self, samples: &[Sample], n_features: usize) -> Result<TrainedModel> {
        let model = SSLOptimizer::new(self.config).train_samples(samples, n_features)?;
        Ok(TrainedModel { model })
    }

    /// Train from LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(self, path: P) -> Result<TrainedModel> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.train(&dataset)
    }
}

/// Trained linear model with high-level prediction interface
#[derive(Debug, Clone)]
pub struct TrainedModel {
    model: TrainedLinearModel,
}

impl TrainedModel {
    /// Predict a single sample
    pub fn predict(&self, sample: &Sample) -> Prediction {
        self.model.predict(sample)
    }

    /// Predict multiple samples
    pub fn predict_batch(&self, samples: &[Sample]) -> Vec<Prediction> {
        self.model.predict_batch(samples)
    }

    /// Predict from dataset
    pub fn predict_dataset<D: Dataset>(&self, dataset: &D) -> Vec<Prediction> {
        let samples: Vec<Sample> = (0..dataset.len()).map(|i| dataset.get_sample(i)).collect();
        self.predict_batch(&samples)
    }

    /// Predict from LibSVM file
    pub fn predict_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Prediction>> {
        let dataset = LibSVMDataset::from_file(path)?;
        Ok(self.predict_dataset(&dataset))
    }

    /// Accuracy on the labeled rows of a dataset; unlabeled rows are skipped
    pub fn evaluate<D: Dataset>(&self, dataset: &D) -> f64 {
        self.evaluate_detailed(dataset).accuracy()
    }

    /// Evaluate accuracy from LibSVM file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<f64> {
        let dataset = LibSVMDataset::from_file(path)?;
        Ok(self.evaluate(&dataset))
    }

    /// Confusion counts over the labeled rows of a dataset
    pub fn evaluate_detailed<D: Dataset>(&self, dataset: &D) -> EvaluationMetrics {
        let predictions = self.predict_dataset(dataset);
        let labels = dataset.get_labels();

        let mut tp = 0; // True positives
        let mut tn = 0; // True negatives
        let mut fp = 0; // False positives
        let mut fn_ = 0; // False negatives

        for (pred, &actual) in predictions.iter().zip(labels.iter()) {
            if actual == 0.0 {
                continue;
            }
            match (pred.label > 0.0, actual > 0.0) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }

        EvaluationMetrics::new(tp, tn, fp, fn_)
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            n_features: self.model.n_features(),
            intercept: self.model.intercept(),
            weight_norm: norm_square(self.model.feature_weights()).sqrt(),
            outcome: self.model.outcome().clone(),
        }
    }

    /// Get the underlying trained model
    pub fn inner(&self) -> &TrainedLinearModel {
        &self.model
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total =
            self.true_positives + self.true_negatives + self.false_positives + self.false_negatives;
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate F1 score
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub n_features: usize,
    pub intercept: f64,
    pub weight_norm: f64,
    pub outcome: TrainingOutcome,
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train a supervised L2-SVM on LibSVM data with default parameters
    pub fn train_libsvm<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        SSL::new().train_from_file(path)
    }

    /// Train a transductive SVM on LibSVM data; rows labeled 0 are unlabeled
    pub fn train_tsvm<P: AsRef<Path>>(path: P, lambda_u: f64, r: f64) -> Result<TrainedModel> {
        SSL::new()
            .with_algorithm(Algorithm::Tsvm)
            .with_lambda_u(lambda_u)
            .with_positive_fraction(r)
            .train_from_file(path)
    }

    /// Quick evaluation: train on training file, test on test file
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
        algorithm: Algorithm,
    ) -> Result<f64> {
        let model = SSL::new()
            .with_algorithm(algorithm)
            .train_from_file(train_path)?;
        model.evaluate_from_file(test_path)
    }

    /// Hide the labels of every row after the first `labeled_ratio` share,
    /// train semi-supervised and report accuracy on the hidden rows
    pub fn hidden_label_accuracy<D: Dataset>(
        dataset: &D,
        labeled_ratio: f64,
        algorithm: Algorithm,
    ) -> Result<f64> {
        if labeled_ratio <= 0.0 || labeled_ratio >= 1.0 {
            return Err(SSLError::InvalidParameter(format!(
                "Labeled ratio must be between 0 and 1, got: {labeled_ratio}"
            )));
        }

        let n = dataset.len();
        let labeled = ((n as f64 * labeled_ratio) as usize).max(1);

        // Sequential split, not randomized for reproducibility
        let truth = dataset.get_labels();
        let samples: Vec<Sample> = (0..n)
            .map(|i| {
                let sample = dataset.get_sample(i);
                if i < labeled {
                    sample
                } else {
                    Sample::unlabeled(sample.features)
                }
            })
            .collect();

        let model = SSL::new()
            .with_algorithm(algorithm)
            .train_samples(&samples, dataset.dim())?;

        let hidden = n - labeled;
        if hidden == 0 {
            return Ok(0.0);
        }
        let outputs = model.inner().training_outputs();
        let correct = (labeled..n)
            .filter(|&i| (outputs[i] >= 0.0) == (truth[i] > 0.0))
            .count();
        Ok(correct as f64 / hidden as f64)
    }
}

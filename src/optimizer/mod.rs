//! Training entry points
//!
//! [`train`] validates a design matrix and configuration, zero-initializes
//! the weights and outputs and dispatches to the selected solver.
//! [`SSLOptimizer`] wraps it for any [`Dataset`] and produces a
//! [`TrainedLinearModel`].

use crate::core::{
    Algorithm, Dataset, LinearModel, OptimizationResult, OptimizerConfig, Result, Sample,
    SparseVector, TrainingOutcome,
};
use crate::data::DesignMatrix;
use crate::solver::{cgls, da_s3vm, l2_svm_mfn, tsvm_mfn, ActiveSubset};
use crate::utils::validation::validate_labels;
use log::{info, warn};

/// Train the configured algorithm on `matrix`
///
/// The matrix is used as given, including its bias column and costs. TSVM
/// needs mutable access for its label/cost scratch space and restores both
/// before returning.
pub fn train(matrix: &mut DesignMatrix, config: &OptimizerConfig) -> Result<OptimizationResult> {
    config.validate()?;
    validate_labels(matrix, config.algorithm)?;

    if config.algorithm == Algorithm::L2Svm && matrix.u() > 0 {
        warn!(
            "L2-SVM fits the {} rows labeled 0 as zero targets; use tsvm or da-s3vm instead",
            matrix.u()
        );
    }

    let mut weights = vec![0.0; matrix.n()];
    let mut outputs = vec![0.0; matrix.m()];

    info!(
        "Training {:?} on {} rows ({} labeled, {} unlabeled), n = {}",
        config.algorithm,
        matrix.m(),
        matrix.l(),
        matrix.u(),
        matrix.n()
    );

    let outcome = match config.algorithm {
        Algorithm::RegularizedLeastSquares => {
            let subset = ActiveSubset::all(matrix.m());
            let status = cgls(matrix, config, &subset, &mut weights, &mut outputs);
            TrainingOutcome::LeastSquares(status)
        }
        Algorithm::L2Svm => {
            let outcome = l2_svm_mfn(matrix, config, &mut weights, &mut outputs, false);
            TrainingOutcome::L2Svm(outcome)
        }
        Algorithm::Tsvm => {
            let switches = tsvm_mfn(matrix, config, &mut weights, &mut outputs);
            TrainingOutcome::Tsvm { switches }
        }
        Algorithm::DaS3vm => {
            let outcome = da_s3vm(matrix, config, &mut weights, &mut outputs);
            TrainingOutcome::DaS3vm(outcome)
        }
    };

    if outcome.is_short_of_optimum() {
        warn!(
            "{:?} stopped before reaching its optimum (code {})",
            config.algorithm,
            outcome.code()
        );
    }

    Ok(OptimizationResult {
        weights,
        outputs,
        outcome,
    })
}

/// Optimizer that trains linear models from datasets
#[derive(Debug, Clone, Default)]
pub struct SSLOptimizer {
    config: OptimizerConfig,
}

impl SSLOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Build the design matrix (with the configured bias) and train on it
    pub fn train<D: Dataset>(&self, dataset: &D) -> Result<TrainedLinearModel> {
        let mut matrix = DesignMatrix::from_dataset(dataset)?.with_bias(self.config.bias);
        self.train_matrix(&mut matrix)
    }

    /// Train on a slice of samples with the given feature count
    pub fn train_samples(
        &self,
        samples: &[Sample],
        n_features: usize,
    ) -> Result<TrainedLinearModel> {
        let mut matrix =
            DesignMatrix::from_samples(samples, n_features)?.with_bias(self.config.bias);
        self.train_matrix(&mut matrix)
    }

    /// Train on a prepared matrix
    pub fn train_matrix(&self, matrix: &mut DesignMatrix) -> Result<TrainedLinearModel> {
        let result = train(matrix, &self.config)?;
        Ok(TrainedLinearModel::new(
            matrix.n_features(),
            matrix.bias(),
            result,
        ))
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

/// Linear decision function learned by one of the solvers
#[derive(Debug, Clone)]
pub struct TrainedLinearModel {
    weights: Vec<f64>,
    n_features: usize,
    bias: Option<f64>,
    outputs: Vec<f64>,
    outcome: TrainingOutcome,
}

impl TrainedLinearModel {
    pub(crate) fn new(n_features: usize, bias: Option<f64>, result: OptimizationResult) -> Self {
        Self {
            weights: result.weights,
            n_features,
            bias,
            outputs: result.outputs,
            outcome: result.outcome,
        }
    }

    /// Feature weights without the bias weight
    pub fn feature_weights(&self) -> &[f64] {
        &self.weights[..self.n_features]
    }

    /// Effective intercept: bias feature value times its weight
    pub fn intercept(&self) -> f64 {
        match self.bias {
            Some(b) => b * self.weights[self.n_features],
            None => 0.0,
        }
    }

    /// Decision values of the training rows
    pub fn training_outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn outcome(&self) -> &TrainingOutcome {
        &self.outcome
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl LinearModel for TrainedLinearModel {
    fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn decision_value(&self, features: &SparseVector) -> f64 {
        features.dot_dense(self.feature_weights()) + self.intercept()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CglsStatus, MfnStatus, SSLError};
    use approx::assert_relative_eq;

    fn sample(x: f64, y: f64, label: f64) -> Sample {
        Sample::new(SparseVector::new(vec![0, 1], vec![x, y]), label)
    }

    fn four_points(extra_unlabeled: bool) -> Vec<Sample> {
        let mut samples = vec![
            sample(1.0, 0.0, 1.0),
            sample(0.0, 1.0, 1.0),
            sample(-1.0, 0.0, -1.0),
            sample(0.0, -1.0, -1.0),
        ];
        if extra_unlabeled {
            samples.push(sample(0.9, 0.8, 0.0));
            samples.push(sample(-0.7, -1.1, 0.0));
        }
        samples
    }

    #[test]
    fn test_train_l2svm_four_points() {
        let mut matrix = DesignMatrix::from_samples(&four_points(false), 2)
            .expect("valid samples")
            .with_bias(1.0);
        let config = OptimizerConfig {
            lambda: 0.01,
            ..Default::default()
        };

        let result = train(&mut matrix, &config).expect("Training should succeed");
        match &result.outcome {
            TrainingOutcome::L2Svm(outcome) => assert_eq!(outcome.status, MfnStatus::Optimal),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(result.outcome.code(), 1);
        for (i, &o) in result.outputs.iter().enumerate() {
            assert_eq!(o.signum(), matrix.labels()[i]);
        }
    }

    #[test]
    fn test_train_least_squares() {
        let samples = vec![
            sample(1.0, 0.0, 2.0),
            sample(0.0, 1.0, -1.0),
            sample(1.0, 1.0, 1.0),
        ];
        let mut matrix = DesignMatrix::from_samples(&samples, 2).expect("valid samples");
        let config = OptimizerConfig {
            algorithm: Algorithm::RegularizedLeastSquares,
            lambda: 1e-6,
            epsilon: 1e-10,
            ..Default::default()
        };

        let result = train(&mut matrix, &config).expect("Training should succeed");
        assert_eq!(
            result.outcome,
            TrainingOutcome::LeastSquares(CglsStatus::Converged)
        );
        // Consistent system: w = (2, -1)
        assert_relative_eq!(result.weights[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(result.weights[1], -1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_train_semi_supervised_dispatch() {
        for algorithm in [Algorithm::Tsvm, Algorithm::DaS3vm] {
            let mut matrix = DesignMatrix::from_samples(&four_points(true), 2)
                .expect("valid samples")
                .with_bias(1.0);
            let config = OptimizerConfig {
                algorithm,
                lambda: 0.01,
                ..Default::default()
            };
            let result = train(&mut matrix, &config).expect("Training should succeed");
            assert_eq!(result.weights.len(), 3);
            assert_eq!(result.outputs.len(), 6);
            assert_eq!(matrix.unlabeled_indices(), vec![4, 5]);
            assert!(result.outputs[4] > 0.0);
            assert!(result.outputs[5] < 0.0);
        }
    }

    #[test]
    fn test_train_rejects_bad_input() {
        let mut matrix = DesignMatrix::from_samples(&four_points(false), 2).expect("valid samples");

        let config = OptimizerConfig {
            lambda: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            train(&mut matrix, &config),
            Err(SSLError::InvalidParameter(_))
        ));

        let config = OptimizerConfig {
            algorithm: Algorithm::Tsvm,
            ..Default::default()
        };
        assert!(matches!(
            train(&mut matrix, &config),
            Err(SSLError::InvalidDataset(_))
        ));

        let mut regression = DesignMatrix::from_samples(&[sample(1.0, 0.0, 0.5)], 2)
            .expect("valid samples");
        assert!(matches!(
            train(&mut regression, &OptimizerConfig::default()),
            Err(SSLError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_optimizer_and_model() {
        let config = OptimizerConfig {
            lambda: 0.01,
            ..Default::default()
        };
        let optimizer = SSLOptimizer::new(config);
        let model = optimizer
            .train_samples(&four_points(false), 2)
            .expect("Training should succeed");

        assert_eq!(model.n_features(), 2);
        assert_eq!(model.weights().len(), 3);
        assert_eq!(model.feature_weights().len(), 2);
        assert_relative_eq!(model.intercept(), 0.0, epsilon = 1e-6);
        assert_eq!(model.training_outputs().len(), 4);

        let prediction = model.predict(&sample(2.0, 0.5, 1.0));
        assert_eq!(prediction.label, 1.0);
        assert_relative_eq!(prediction.decision_value, 2.5 / 1.02, epsilon = 1e-5);

        // Features beyond the training dimension are ignored
        let wide = Sample::new(SparseVector::new(vec![0, 7], vec![-1.0, 3.0]), -1.0);
        assert_eq!(model.predict(&wide).label, -1.0);
    }
}

//! Core type definitions for the linear SSL solvers

use crate::core::{Result, SSLError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Dot product with a dense vector; indices past its end count as zero
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(self.values.iter())
            .filter(|(&idx, _)| idx < dense.len())
            .map(|(&idx, &value)| value * dense[idx])
            .sum()
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A row of the design matrix together with its label
///
/// A label of `0.0` marks the row as unlabeled.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Feature vector (sparse representation)
    pub features: SparseVector,
    /// +1/-1 for labeled rows, 0 for unlabeled rows, any real for regression
    pub label: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: SparseVector, label: f64) -> Self {
        Self { features, label }
    }

    /// Create an unlabeled sample
    pub fn unlabeled(features: SparseVector) -> Self {
        Self {
            features,
            label: 0.0,
        }
    }

    /// Whether the sample carries the unlabeled sentinel
    pub fn is_unlabeled(&self) -> bool {
        self.label == 0.0
    }
}

/// Training algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Regularized least squares (CGLS over every row)
    RegularizedLeastSquares,
    /// Modified finite Newton L2-SVM
    L2Svm,
    /// Transductive L2-SVM with label switching
    Tsvm,
    /// Deterministic annealing semi-supervised L2-SVM
    DaS3vm,
}

impl Algorithm {
    /// Whether the algorithm requires labels in {-1, 0, +1}
    pub fn is_classification(&self) -> bool {
        !matches!(self, Algorithm::RegularizedLeastSquares)
    }

    /// Whether the algorithm makes use of unlabeled rows
    pub fn is_semi_supervised(&self) -> bool {
        matches!(self, Algorithm::Tsvm | Algorithm::DaS3vm)
    }
}

/// Configuration shared by every solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Algorithm to run
    pub algorithm: Algorithm,
    /// Regularization on the weight vector
    pub lambda: f64,
    /// Target regularization on the unlabeled loss (TSVM, DA-S3VM)
    pub lambda_u: f64,
    /// Expected fraction of positives among unlabeled rows
    pub r: f64,
    /// Maximum label switches per TSVM pass
    pub s: usize,
    /// Maximum conjugate gradient iterations
    pub cg_iter_max: usize,
    /// Maximum finite Newton iterations
    pub mfn_iter_max: usize,
    /// Tight convergence threshold
    pub epsilon: f64,
    /// Value of the constant bias feature, 0 disables the bias column
    pub bias: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::L2Svm,
            lambda: 1.0,
            lambda_u: 1.0,
            r: 0.5,
            s: 10_000,
            cg_iter_max: 10_000,
            mfn_iter_max: 50,
            epsilon: 1e-6,
            bias: 1.0,
        }
    }
}

impl OptimizerConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.lambda > 0.0) {
            return Err(SSLError::InvalidParameter(format!(
                "lambda must be positive, got {}",
                self.lambda
            )));
        }
        if self.algorithm.is_semi_supervised() && !(self.lambda_u > 0.0) {
            return Err(SSLError::InvalidParameter(format!(
                "lambda_u must be positive, got {}",
                self.lambda_u
            )));
        }
        if !(self.r > 0.0 && self.r < 1.0) {
            return Err(SSLError::InvalidParameter(format!(
                "positive fraction r must lie in (0, 1), got {}",
                self.r
            )));
        }
        if !(self.epsilon > 0.0) {
            return Err(SSLError::InvalidParameter(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.cg_iter_max == 0 || self.mfn_iter_max == 0 {
            return Err(SSLError::InvalidParameter(
                "iteration limits must be at least 1".to_string(),
            ));
        }
        if self.bias < 0.0 {
            return Err(SSLError::InvalidParameter(format!(
                "bias must be non-negative, got {}",
                self.bias
            )));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SSLError::IoError)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SSLError::IoError)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Termination status of a CGLS solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CglsStatus {
    /// Iteration cap reached
    MaxIterations,
    /// Residual dropped below the tolerance
    Converged,
}

impl CglsStatus {
    /// Integer code: 0 = max iterations, 1 = converged
    pub fn code(&self) -> i32 {
        match self {
            CglsStatus::MaxIterations => 0,
            CglsStatus::Converged => 1,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, CglsStatus::Converged)
    }
}

/// Termination status of a finite Newton solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfnStatus {
    /// Iteration cap reached
    MaxIterations,
    /// Optimality conditions hold under the tight epsilon
    Optimal,
    /// Objective stopped decreasing
    ObjectiveStalled,
}

impl MfnStatus {
    /// Integer code: 0 = max iterations, 1 = optimal, 2 = relative criterion
    pub fn code(&self) -> i32 {
        match self {
            MfnStatus::MaxIterations => 0,
            MfnStatus::Optimal => 1,
            MfnStatus::ObjectiveStalled => 2,
        }
    }

    /// Whether the solve stopped for a reason other than the iteration cap
    pub fn is_converged(&self) -> bool {
        !matches!(self, MfnStatus::MaxIterations)
    }
}

/// Summary of a finite Newton solve
#[derive(Debug, Clone, PartialEq)]
pub struct MfnOutcome {
    pub status: MfnStatus,
    /// Number of Newton iterations performed
    pub iterations: usize,
    /// Objective value at termination
    pub objective: f64,
    /// Objective after initialization and after every line search update
    pub objective_history: Vec<f64>,
}

/// Summary of a deterministic annealing run
#[derive(Debug, Clone, PartialEq)]
pub struct DaOutcome {
    /// Lowest transductive objective seen
    pub objective: f64,
    /// Outer (temperature) iterations performed
    pub outer_iterations: usize,
    /// Mean binary entropy of the final soft labels
    pub entropy: f64,
}

impl DaOutcome {
    /// DA-S3VM always reports code 1
    pub fn code(&self) -> i32 {
        1
    }
}

/// Per-algorithm result of a training call
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingOutcome {
    LeastSquares(CglsStatus),
    L2Svm(MfnOutcome),
    Tsvm { switches: usize },
    DaS3vm(DaOutcome),
}

impl TrainingOutcome {
    /// Integer status code of the underlying algorithm
    ///
    /// TSVM reports its switch count, saturating at `i32::MAX`.
    pub fn code(&self) -> i32 {
        match self {
            TrainingOutcome::LeastSquares(status) => status.code(),
            TrainingOutcome::L2Svm(outcome) => outcome.status.code(),
            TrainingOutcome::Tsvm { switches } => i32::try_from(*switches).unwrap_or(i32::MAX),
            TrainingOutcome::DaS3vm(outcome) => outcome.code(),
        }
    }

    /// Whether the algorithm ended short of its optimum
    pub fn is_short_of_optimum(&self) -> bool {
        match self {
            TrainingOutcome::LeastSquares(status) => !status.is_converged(),
            TrainingOutcome::L2Svm(outcome) => !outcome.status.is_converged(),
            TrainingOutcome::Tsvm { .. } | TrainingOutcome::DaS3vm(_) => false,
        }
    }
}

/// Result of a training call
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Weight vector (last entry is the bias weight when a bias column is used)
    pub weights: Vec<f64>,
    /// Decision values for every row of the training matrix
    pub outputs: Vec<f64>,
    /// Algorithm specific status
    pub outcome: TrainingOutcome,
}

//! Utility functions shared by the solvers and the command line driver

use crate::core::{Algorithm, Dataset, Result, SSLError};
use crate::data::DesignMatrix;

/// Objective and divergence helpers for the semi-supervised solvers
pub mod objective {
    /// Squared Euclidean norm
    pub fn norm_square(v: &[f64]) -> f64 {
        v.iter().map(|&x| x * x).sum()
    }

    /// Transductive L2-SVM objective
    ///
    /// `0.5 * (lambda*|w|^2 + lambda_u/u * sum_unlabeled max(0, 1-|o|)^2
    /// + 1/l * sum_labeled max(0, 1-y*o)^2)`, where rows labeled `0` are the
    /// unlabeled ones. An empty group contributes nothing.
    pub fn transductive_cost(
        norm_weights: f64,
        labels: &[f64],
        outputs: &[f64],
        lambda: f64,
        lambda_u: f64,
    ) -> f64 {
        assert_eq!(
            labels.len(),
            outputs.len(),
            "labels/outputs length mismatch"
        );

        let mut unlabeled_loss = 0.0;
        let mut labeled_loss = 0.0;
        let mut u = 0usize;
        let mut l = 0usize;

        for (&y, &o) in labels.iter().zip(outputs) {
            if y == 0.0 {
                let slack = 1.0 - o.abs();
                if slack > 0.0 {
                    unlabeled_loss += slack * slack;
                }
                u += 1;
            } else {
                let slack = 1.0 - y * o;
                if slack > 0.0 {
                    labeled_loss += slack * slack;
                }
                l += 1;
            }
        }

        let mut cost = lambda * norm_weights;
        if u > 0 {
            cost += lambda_u * unlabeled_loss / u as f64;
        }
        if l > 0 {
            cost += labeled_loss / l as f64;
        }
        0.5 * cost
    }

    /// Mean binary entropy (bits) of a vector of probabilities
    pub fn mean_entropy(p: &[f64]) -> f64 {
        if p.is_empty() {
            return 0.0;
        }
        let h: f64 = p
            .iter()
            .filter(|&&q| q > 0.0 && q < 1.0)
            .map(|&q| -(q * q.log2() + (1.0 - q) * (1.0 - q).log2()))
            .sum();
        h / p.len() as f64
    }

    /// Mean binary KL divergence KL(p || q) in bits
    ///
    /// Both arguments are clamped away from 0 and 1 by `1e-8`; per-entry
    /// terms that are negligible or NaN count as zero.
    pub fn mean_kl_divergence(p: &[f64], q: &[f64]) -> f64 {
        assert_eq!(p.len(), q.len(), "distribution length mismatch");
        if p.is_empty() {
            return 0.0;
        }

        const CLAMP: f64 = 1e-8;
        let h: f64 = p
            .iter()
            .zip(q)
            .map(|(&p1, &q1)| {
                let p1 = p1.clamp(CLAMP, 1.0 - CLAMP);
                let q1 = q1.clamp(CLAMP, 1.0 - CLAMP);
                let g = p1 * (p1 / q1).log2() + (1.0 - p1) * ((1.0 - p1) / (1.0 - q1)).log2();
                if g.abs() < 1e-12 || g.is_nan() {
                    0.0
                } else {
                    g
                }
            })
            .sum();
        h / p.len() as f64
    }
}

/// Validation and preprocessing utilities
pub mod validation {
    use super::*;

    /// Check that every label is allowed for the chosen algorithm
    ///
    /// Classification algorithms need labels in {-1, 0, +1}; supervised ones
    /// additionally need at least one labeled row, and the semi-supervised
    /// ones both labeled and unlabeled rows.
    pub fn validate_labels(matrix: &DesignMatrix, algorithm: Algorithm) -> Result<()> {
        if algorithm.is_classification() {
            if let Some(&y) = matrix
                .labels()
                .iter()
                .find(|&&y| y != 1.0 && y != -1.0 && y != 0.0)
            {
                return Err(SSLError::InvalidLabel(y));
            }
        }
        if matrix.l() == 0 && algorithm.is_classification() {
            return Err(SSLError::InvalidDataset(
                "at least one labeled row is required".to_string(),
            ));
        }
        if algorithm.is_semi_supervised() && matrix.u() == 0 {
            return Err(SSLError::InvalidDataset(
                "semi-supervised training needs rows labeled 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Count positive, negative and unlabeled rows
    pub fn label_counts<D: Dataset>(dataset: &D) -> (usize, usize, usize) {
        let labels = dataset.get_labels();
        let positives = labels.iter().filter(|&&y| y > 0.0).count();
        let negatives = labels.iter().filter(|&&y| y < 0.0).count();
        (positives, negatives, labels.len() - positives - negatives)
    }
}

/// Statistical utilities for design matrices
pub mod stats {
    use super::*;

    /// Shape and sparsity summary of a design matrix
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct MatrixStats {
        pub rows: usize,
        pub features: usize,
        pub labeled: usize,
        pub unlabeled: usize,
        pub positives: usize,
        pub negatives: usize,
        pub nnz: usize,
        pub mean_nnz: f64,
        pub min_nnz: usize,
        pub max_nnz: usize,
        /// Fraction of stored entries among rows * features
        pub density: f64,
    }

    /// Summarize a design matrix
    pub fn matrix_stats(matrix: &DesignMatrix) -> MatrixStats {
        let m = matrix.m();
        let row_nnz: Vec<usize> = (0..m).map(|i| matrix.row(i).0.len()).collect();
        let labels = matrix.labels();
        let cells = m * matrix.n_features();

        MatrixStats {
            rows: m,
            features: matrix.n_features(),
            labeled: matrix.l(),
            unlabeled: matrix.u(),
            positives: labels.iter().filter(|&&y| y > 0.0).count(),
            negatives: labels.iter().filter(|&&y| y < 0.0).count(),
            nnz: matrix.nnz(),
            mean_nnz: matrix.nnz() as f64 / m as f64,
            min_nnz: row_nnz.iter().copied().min().unwrap_or(0),
            max_nnz: row_nnz.iter().copied().max().unwrap_or(0),
            density: if cells > 0 {
                matrix.nnz() as f64 / cells as f64
            } else {
                0.0
            },
        }
    }
}

pub use self::objective::*;
pub use self::stats::MatrixStats;

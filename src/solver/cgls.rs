//! Conjugate gradient least squares over an active subset of rows
//!
//! Solves
//!
//! ```text
//! min_w  0.5 * lambda * |w|^2 + 0.5 * sum_{i in J} C_i * (y_i - x_i.w)^2
//! ```
//!
//! by conjugate gradients on the normal equations, warm-started from the
//! current weights and outputs. Only the outputs of rows in `J` are kept in
//! sync; every other output is left untouched.

use crate::core::{CglsStatus, OptimizerConfig, TargetSource};
use crate::data::DesignMatrix;
use crate::solver::ActiveSubset;
use crate::utils::norm_square;
use log::debug;

/// Parameters of a single CG solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgSettings {
    pub lambda: f64,
    /// Relative residual tolerance
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl CgSettings {
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            lambda: config.lambda,
            epsilon: config.epsilon,
            max_iterations: config.cg_iter_max,
        }
    }
}

/// Status and iteration count of a CG solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgReport {
    pub status: CglsStatus,
    pub iterations: usize,
}

/// Solve the regularized least squares problem over `rows`, reading targets
/// and costs from `targets`
///
/// `weights` has length `matrix.n()`; `outputs` is indexed by matrix row and
/// may be longer than `matrix.m()` (the extra entries are never touched).
///
/// # Panics
/// Panics if the weight dimension does not match or a row index is out of
/// range.
pub fn solve_active<T>(
    matrix: &DesignMatrix,
    targets: &T,
    rows: &[usize],
    settings: &CgSettings,
    weights: &mut [f64],
    outputs: &mut [f64],
) -> CgReport
where
    T: TargetSource + ?Sized,
{
    assert_eq!(weights.len(), matrix.n(), "weight dimension mismatch");
    assert!(
        outputs.len() >= matrix.m(),
        "output vector shorter than matrix"
    );
    assert!(
        rows.iter().all(|&i| i < matrix.m()),
        "active row index out of range"
    );

    let n = matrix.n();
    let lambda = settings.lambda;
    let epsilon2 = settings.epsilon * settings.epsilon;

    // z = C (y - o) on the active rows
    let mut z: Vec<f64> = rows
        .iter()
        .map(|&i| targets.cost(i) * (targets.label(i) - outputs[i]))
        .collect();
    let mut q = vec![0.0; rows.len()];

    let mut r = vec![0.0; n];
    gradient(matrix, rows, &z, lambda, weights, &mut r);
    let mut p = r.clone();
    let mut omega1 = norm_square(&r);
    let mut omega_p = omega1;

    if omega1 <= epsilon2 * norm_square(&z) {
        debug!("CGLS: start point already optimal");
        return CgReport {
            status: CglsStatus::Converged,
            iterations: 0,
        };
    }

    let mut iterations = 0;
    while iterations < settings.max_iterations {
        iterations += 1;

        let mut omega_q = 0.0;
        for (k, &i) in rows.iter().enumerate() {
            let t = matrix.row_dot(i, &p);
            q[k] = t;
            omega_q += targets.cost(i) * t * t;
        }

        let gamma = omega1 / (lambda * omega_p + omega_q);
        let inv_omega2 = 1.0 / omega1;

        for (w, &pj) in weights.iter_mut().zip(&p) {
            *w += gamma * pj;
        }

        let mut omega_z = 0.0;
        for (k, &i) in rows.iter().enumerate() {
            outputs[i] += gamma * q[k];
            z[k] -= gamma * targets.cost(i) * q[k];
            omega_z += z[k] * z[k];
        }

        gradient(matrix, rows, &z, lambda, weights, &mut r);
        omega1 = norm_square(&r);
        debug!("CGLS iteration {iterations}: |r|^2 = {omega1:e}");

        if omega1 <= epsilon2 * omega_z {
            debug!("CGLS converged in {iterations} iteration(s)");
            return CgReport {
                status: CglsStatus::Converged,
                iterations,
            };
        }

        let scale = omega1 * inv_omega2;
        for (pj, &rj) in p.iter_mut().zip(&r) {
            *pj = rj + *pj * scale;
        }
        omega_p = norm_square(&p);
    }

    debug!("CGLS stopped at the iteration cap ({iterations})");
    CgReport {
        status: CglsStatus::MaxIterations,
        iterations,
    }
}

/// `r = sum_k z_k x_{rows[k]} - lambda * w`
fn gradient(
    matrix: &DesignMatrix,
    rows: &[usize],
    z: &[f64],
    lambda: f64,
    weights: &[f64],
    r: &mut [f64],
) {
    r.fill(0.0);
    for (&i, &zk) in rows.iter().zip(z) {
        matrix.add_scaled_row(i, zk, r);
    }
    for (rj, &wj) in r.iter_mut().zip(weights) {
        *rj -= lambda * wj;
    }
}

/// Regularized least squares over the active rows of `subset`, using the
/// matrix's own labels and costs
///
/// Runs at most `config.cg_iter_max` iterations with tolerance
/// `config.epsilon`.
pub fn cgls(
    matrix: &DesignMatrix,
    config: &OptimizerConfig,
    subset: &ActiveSubset,
    weights: &mut [f64],
    outputs: &mut [f64],
) -> CglsStatus {
    let report = solve_active(
        matrix,
        matrix,
        subset.active(),
        &CgSettings::from_config(config),
        weights,
        outputs,
    );
    report.status
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Rows [1,0], [0,1], [1,1] with the bias column enabled
    fn ridge_matrix(labels: Vec<f64>, costs: Vec<f64>) -> DesignMatrix {
        DesignMatrix::new(
            2,
            vec![0, 1, 2, 4],
            vec![0, 1, 0, 1],
            vec![1.0, 1.0, 1.0, 1.0],
            labels,
            Some(costs),
        )
        .expect("valid matrix")
        .with_bias(1.0)
    }

    /// Solve (lambda I + X^T C X) w = X^T C y by Gaussian elimination
    fn closed_form(matrix: &DesignMatrix, lambda: f64) -> Vec<f64> {
        let n = matrix.n();
        let mut a = vec![vec![0.0; n + 1]; n];
        for (j, row) in a.iter_mut().enumerate() {
            row[j] = lambda;
        }
        for i in 0..matrix.m() {
            let mut x = vec![0.0; n];
            matrix.add_scaled_row(i, 1.0, &mut x);
            let c = matrix.cost(i);
            for j in 0..n {
                for k in 0..n {
                    a[j][k] += c * x[j] * x[k];
                }
                a[j][n] += c * x[j] * matrix.label(i);
            }
        }
        for col in 0..n {
            let pivot = a[col][col];
            for row in (col + 1)..n {
                let factor = a[row][col] / pivot;
                for k in col..=n {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }
        let mut w = vec![0.0; n];
        for row in (0..n).rev() {
            let s: f64 = ((row + 1)..n).map(|k| a[row][k] * w[k]).sum();
            w[row] = (a[row][n] - s) / a[row][row];
        }
        w
    }

    fn config(lambda: f64) -> OptimizerConfig {
        OptimizerConfig {
            lambda,
            epsilon: 1e-10,
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_closed_form_ridge() {
        let matrix = ridge_matrix(vec![1.0, 1.0, 2.0], vec![1.0, 0.5, 2.0]);
        let config = config(0.1);
        let mut w = vec![0.0; 3];
        let mut o = vec![0.0; 3];

        let status = cgls(&matrix, &config, &ActiveSubset::all(3), &mut w, &mut o);
        assert_eq!(status, CglsStatus::Converged);

        let expected = closed_form(&matrix, 0.1);
        for (a, b) in w.iter().zip(&expected) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
        // Outputs stay consistent with the weights
        for i in 0..3 {
            assert_relative_eq!(o[i], matrix.row_dot(i, &w), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_warm_start_from_optimum() {
        let matrix = ridge_matrix(vec![-1.0, 0.5, 3.0], vec![1.0; 3]);
        let config = config(1.0);
        let mut w = closed_form(&matrix, 1.0);
        let mut o = matrix.outputs(&w);
        let before = w.clone();

        let report = solve_active(
            &matrix,
            &matrix,
            &[0, 1, 2],
            &CgSettings::from_config(&config),
            &mut w,
            &mut o,
        );
        assert_eq!(report.status, CglsStatus::Converged);
        assert!(report.iterations <= 1);
        for (a, b) in w.iter().zip(&before) {
            assert_relative_eq!(a, b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_inactive_outputs_untouched() {
        let matrix = ridge_matrix(vec![1.0, -1.0, 1.0], vec![1.0; 3]);
        let subset = ActiveSubset::partition(3, |i| i != 1);
        let mut w = vec![0.0; 3];
        let mut o = vec![0.0, 42.0, 0.0];

        cgls(&matrix, &config(0.5), &subset, &mut w, &mut o);
        assert_eq!(o[1], 42.0);
        assert_relative_eq!(o[0], matrix.row_dot(0, &w), epsilon = 1e-9);
    }

    #[test]
    fn test_empty_active_set() {
        let matrix = ridge_matrix(vec![1.0, 1.0, 1.0], vec![1.0; 3]);
        let subset = ActiveSubset::partition(3, |_| false);

        // Zero weights are already the minimizer of 0.5 * lambda * |w|^2
        let mut w = vec![0.0; 3];
        let mut o = vec![5.0; 3];
        let status = cgls(&matrix, &config(1.0), &subset, &mut w, &mut o);
        assert_eq!(status, CglsStatus::Converged);
        assert_eq!(w, vec![0.0; 3]);
        assert_eq!(o, vec![5.0; 3]);

        // Non-zero weights shrink to zero in a single step
        let mut w = vec![1.0, -2.0, 0.5];
        let report = solve_active(
            &matrix,
            &matrix,
            subset.active(),
            &CgSettings::from_config(&config(1.0)),
            &mut w,
            &mut o,
        );
        assert_eq!(report.status, CglsStatus::Converged);
        assert_eq!(report.iterations, 1);
        for wj in w {
            assert_relative_eq!(wj, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_iteration_cap() {
        let matrix = ridge_matrix(vec![1.0, -1.0, 2.0], vec![1.0; 3]);
        let settings = CgSettings {
            lambda: 1e-3,
            epsilon: 1e-14,
            max_iterations: 1,
        };
        let mut w = vec![0.0; 3];
        let mut o = vec![0.0; 3];
        let report = solve_active(&matrix, &matrix, &[0, 1, 2], &settings, &mut w, &mut o);
        assert_eq!(report.status, CglsStatus::MaxIterations);
        assert_eq!(report.iterations, 1);
    }

    #[test]
    #[should_panic(expected = "active row index out of range")]
    fn test_row_out_of_range() {
        let matrix = ridge_matrix(vec![1.0; 3], vec![1.0; 3]);
        let mut w = vec![0.0; 3];
        let mut o = vec![0.0; 3];
        solve_active(
            &matrix,
            &matrix,
            &[3],
            &CgSettings::from_config(&config(1.0)),
            &mut w,
            &mut o,
        );
    }
}

//! Modified finite Newton L2-SVM
//!
//! Minimizes
//!
//! ```text
//! 0.5 * lambda * |w|^2 + 0.5 * sum_i C_i * max(0, 1 - y_i x_i.w)^2
//! ```
//!
//! Each Newton step solves a regularized least squares problem over the
//! currently violating rows with CGLS and then takes an exact line search
//! step toward that solution.

use crate::core::{MfnOutcome, MfnStatus, OptimizerConfig};
use crate::data::DesignMatrix;
use crate::solver::cgls::{solve_active, CgSettings};
use crate::solver::line_search::line_search;
use crate::solver::{ActiveSubset, BIG_EPSILON, RELATIVE_STOP_EPS, SMALL_CG_ITER_MAX};
use crate::utils::norm_square;
use log::{debug, info};

/// Tolerance schedule of a cold start
///
/// A cold start first converges to the coarse tolerance with a short CG
/// budget, then tightens to the configured epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpsilonPhase {
    Coarse,
    Tight,
}

impl EpsilonPhase {
    pub fn initial(warm_start: bool) -> Self {
        if warm_start {
            EpsilonPhase::Tight
        } else {
            EpsilonPhase::Coarse
        }
    }

    pub fn epsilon(&self, config: &OptimizerConfig) -> f64 {
        match self {
            EpsilonPhase::Coarse => BIG_EPSILON,
            EpsilonPhase::Tight => config.epsilon,
        }
    }

    /// CG budget for the first Newton step
    pub fn first_cg_budget(&self, config: &OptimizerConfig) -> usize {
        match self {
            EpsilonPhase::Coarse => SMALL_CG_ITER_MAX.min(config.cg_iter_max),
            EpsilonPhase::Tight => config.cg_iter_max,
        }
    }
}

/// Train an L2-SVM on every row of `matrix`, using its labels and costs
///
/// `weights` (length `n`) and `outputs` (length `m`) hold the starting point
/// and receive the solution; outputs stay consistent with `row . w`. With
/// `warm_start` the tight tolerance is used from the first iteration.
///
/// # Panics
/// Panics if the vector lengths do not match the matrix.
pub fn l2_svm_mfn(
    matrix: &DesignMatrix,
    config: &OptimizerConfig,
    weights: &mut [f64],
    outputs: &mut [f64],
    warm_start: bool,
) -> MfnOutcome {
    assert_eq!(weights.len(), matrix.n(), "weight dimension mismatch");
    assert_eq!(outputs.len(), matrix.m(), "output dimension mismatch");

    let labels = matrix.labels();
    let costs = matrix.costs();

    let mut phase = EpsilonPhase::initial(warm_start);
    let mut settings = CgSettings {
        lambda: config.lambda,
        epsilon: phase.epsilon(config),
        max_iterations: phase.first_cg_budget(config),
    };

    let mut objective = primal_objective(config.lambda, weights, labels, costs, outputs);
    let mut subset = ActiveSubset::partition(matrix.m(), |i| labels[i] * outputs[i] < 1.0);
    let mut history = vec![objective];

    let mut weights_bar = vec![0.0; weights.len()];
    let mut outputs_bar = vec![0.0; outputs.len()];

    let mut iterations = 0;
    while iterations < config.mfn_iter_max {
        iterations += 1;
        debug!(
            "L2-SVM-MFN iteration {iterations} ({} active rows, objective = {objective})",
            subset.active_len()
        );

        weights_bar.copy_from_slice(weights);
        outputs_bar.copy_from_slice(outputs);

        let report = solve_active(
            matrix,
            matrix,
            subset.active(),
            &settings,
            &mut weights_bar,
            &mut outputs_bar,
        );
        refresh_outputs(matrix, subset.inactive(), &weights_bar, &mut outputs_bar);
        settings.max_iterations = config.cg_iter_max;

        let optimal = report.status.is_converged()
            && margins_hold(&subset, labels, &outputs_bar, settings.epsilon);

        if optimal {
            if phase == EpsilonPhase::Coarse {
                phase = EpsilonPhase::Tight;
                settings.epsilon = phase.epsilon(config);
                debug!(
                    "epsilon = {BIG_EPSILON} converged, continuing with epsilon = {}",
                    settings.epsilon
                );
                continue;
            }

            weights.copy_from_slice(&weights_bar);
            outputs.copy_from_slice(&outputs_bar);
            let objective = primal_objective(config.lambda, weights, labels, costs, outputs);
            info!("L2-SVM-MFN converged (optimality) in {iterations} iteration(s)");
            return MfnOutcome {
                status: MfnStatus::Optimal,
                iterations,
                objective,
                objective_history: history,
            };
        }

        let delta = line_search(
            weights,
            &weights_bar,
            config.lambda,
            outputs,
            &outputs_bar,
            labels,
            costs,
        );
        debug!("line search delta = {delta}");

        for (w, &wb) in weights.iter_mut().zip(&weights_bar) {
            *w += delta * (wb - *w);
        }
        for (o, &ob) in outputs.iter_mut().zip(&outputs_bar) {
            *o += delta * (ob - *o);
        }

        let previous = objective;
        objective = primal_objective(config.lambda, weights, labels, costs, outputs);
        subset.repartition(|i| labels[i] * outputs[i] < 1.0);
        history.push(objective);

        if (objective - previous).abs() < RELATIVE_STOP_EPS * previous.abs() {
            info!("L2-SVM-MFN converged (relative criterion) in {iterations} iteration(s)");
            return MfnOutcome {
                status: MfnStatus::ObjectiveStalled,
                iterations,
                objective,
                objective_history: history,
            };
        }
    }

    info!("L2-SVM-MFN stopped at the iteration cap ({iterations})");
    MfnOutcome {
        status: MfnStatus::MaxIterations,
        iterations,
        objective,
        objective_history: history,
    }
}

/// Recompute `o[i] = x_i . w` for the given rows
pub(crate) fn refresh_outputs(matrix: &DesignMatrix, rows: &[usize], w: &[f64], o: &mut [f64]) {
    for &i in rows {
        o[i] = matrix.row_dot(i, w);
    }
}

/// Active rows may not overshoot the margin, inactive rows must keep it
fn margins_hold(subset: &ActiveSubset, labels: &[f64], outputs: &[f64], epsilon: f64) -> bool {
    subset
        .active()
        .iter()
        .all(|&i| labels[i] * outputs[i] <= 1.0 + epsilon)
        && subset
            .inactive()
            .iter()
            .all(|&i| labels[i] * outputs[i] >= 1.0 - epsilon)
}

/// `0.5 * lambda * |w|^2 + 0.5 * sum_i C_i * max(0, 1 - y_i o_i)^2`
pub(crate) fn primal_objective(
    lambda: f64,
    weights: &[f64],
    labels: &[f64],
    costs: &[f64],
    outputs: &[f64],
) -> f64 {
    let loss: f64 = labels
        .iter()
        .zip(costs)
        .zip(outputs)
        .map(|((&y, &c), &o)| {
            let slack = 1.0 - y * o;
            if slack > 0.0 {
                c * slack * slack
            } else {
                0.0
            }
        })
        .sum();
    0.5 * (lambda * norm_square(weights) + loss)
}

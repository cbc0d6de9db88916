//! Deterministic annealing semi-supervised L2-SVM
//!
//! Unlabeled rows carry soft labels `p_j` (probability of the positive
//! class) whose mean is pinned to the expected positive fraction. The
//! objective alternates between the weights (a weighted finite Newton solve
//! in which every unlabeled row acts as a positive and a negative copy) and
//! the soft labels (a one-dimensional root search), while the temperature
//! is lowered until the soft labels harden.

use crate::core::{DaOutcome, MfnOutcome, MfnStatus, OptimizerConfig, TargetSource};
use crate::data::DesignMatrix;
use crate::solver::cgls::{solve_active, CgSettings};
use crate::solver::line_search::line_search;
use crate::solver::mfn::{l2_svm_mfn, primal_objective, refresh_outputs, EpsilonPhase};
use crate::solver::root::optimize_p;
use crate::solver::{
    ActiveSubset, BIG_EPSILON, DA_ANNEALING_RATE, DA_INIT_TEMP, DA_INNER_ITER_MAX,
    DA_OUTER_ITER_MAX,
};
use crate::utils::{mean_entropy, mean_kl_divergence, norm_square, transductive_cost};
use log::{debug, info, warn};

/// Which of the two virtual copies of an unlabeled row is inside its margin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlabeledRegime {
    /// `|o| < 1`: both copies violate, the pair acts as one row with target
    /// `2p - 1` and cost `lambda_u / u`
    Balanced,
    /// `o <= -1`: only the positive copy violates
    ViolatingPositive,
    /// `o >= 1`: only the negative copy violates
    ViolatingNegative,
}

impl UnlabeledRegime {
    pub fn classify(output: f64) -> Self {
        if output.abs() < 1.0 {
            UnlabeledRegime::Balanced
        } else if output > 0.0 {
            UnlabeledRegime::ViolatingNegative
        } else {
            UnlabeledRegime::ViolatingPositive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RowTarget {
    Labeled(f64),
    Unlabeled { slot: usize, regime: UnlabeledRegime },
}

/// Effective least squares targets for the weighted Newton step
///
/// Labeled rows keep their label at cost `1/l`; unlabeled rows read their
/// target and cost from the current regime and soft label.
struct WeightedTargets<'a> {
    rows: Vec<RowTarget>,
    p: &'a [f64],
    labeled_cost: f64,
    lambda_u_by_u: f64,
}

impl<'a> WeightedTargets<'a> {
    fn new(matrix: &DesignMatrix, p: &'a [f64], lambda_u: f64) -> Self {
        let mut slot = 0;
        let rows = matrix
            .labels()
            .iter()
            .map(|&y| {
                if y == 0.0 {
                    slot += 1;
                    RowTarget::Unlabeled {
                        slot: slot - 1,
                        regime: UnlabeledRegime::Balanced,
                    }
                } else {
                    RowTarget::Labeled(y)
                }
            })
            .collect();

        let l = matrix.l();
        Self {
            rows,
            p,
            labeled_cost: if l > 0 { 1.0 / l as f64 } else { 0.0 },
            lambda_u_by_u: lambda_u / p.len().max(1) as f64,
        }
    }

    /// Reclassify every unlabeled row from the current outputs
    fn classify(&mut self, outputs: &[f64]) {
        for (row, &o) in self.rows.iter_mut().zip(outputs) {
            if let RowTarget::Unlabeled { regime, .. } = row {
                *regime = UnlabeledRegime::classify(o);
            }
        }
    }

    /// Unlabeled rows are always active, labeled rows while inside the margin
    fn is_active(&self, row: usize, o: f64) -> bool {
        match self.rows[row] {
            RowTarget::Labeled(y) => y * o < 1.0,
            RowTarget::Unlabeled { .. } => true,
        }
    }

    /// Row `row` meets its optimality condition at output `o`
    fn satisfied(&self, row: usize, active: bool, o: f64, epsilon: f64) -> bool {
        match self.rows[row] {
            RowTarget::Labeled(y) if active => y * o <= 1.0 + epsilon,
            RowTarget::Labeled(y) => y * o >= 1.0 - epsilon,
            RowTarget::Unlabeled {
                regime: UnlabeledRegime::Balanced,
                ..
            } => o.abs() <= 1.0 + epsilon,
            RowTarget::Unlabeled { .. } => o.abs() >= 1.0 - epsilon,
        }
    }
}

impl TargetSource for WeightedTargets<'_> {
    fn label(&self, row: usize) -> f64 {
        match self.rows[row] {
            RowTarget::Labeled(y) => y,
            RowTarget::Unlabeled { slot, regime } => match regime {
                UnlabeledRegime::Balanced => 2.0 * self.p[slot] - 1.0,
                UnlabeledRegime::ViolatingPositive => 1.0,
                UnlabeledRegime::ViolatingNegative => -1.0,
            },
        }
    }

    fn cost(&self, row: usize) -> f64 {
        match self.rows[row] {
            RowTarget::Labeled(_) => self.labeled_cost,
            RowTarget::Unlabeled { slot, regime } => match regime {
                UnlabeledRegime::Balanced => self.lambda_u_by_u,
                UnlabeledRegime::ViolatingPositive => self.lambda_u_by_u * self.p[slot],
                UnlabeledRegime::ViolatingNegative => self.lambda_u_by_u * (1.0 - self.p[slot]),
            },
        }
    }
}

/// Weighted finite Newton solve for fixed soft labels `p`
///
/// Minimizes
///
/// ```text
/// 0.5 * (lambda |w|^2 + 1/l sum_labeled max(0, 1 - y o)^2
///   + lambda_u/u sum_unlabeled [p max(0, 1 - o)^2 + (1 - p) max(0, 1 + o)^2])
/// ```
///
/// `p` holds one entry per unlabeled row, in row order. The matrix is only
/// read. Stops on optimality, on an absolute objective change below
/// `config.epsilon`, or at the iteration cap.
///
/// # Panics
/// Panics if the vector lengths do not match the matrix.
pub fn optimize_w(
    matrix: &DesignMatrix,
    p: &[f64],
    config: &OptimizerConfig,
    weights: &mut [f64],
    outputs: &mut [f64],
    warm_start: bool,
) -> MfnOutcome {
    let m = matrix.m();
    assert_eq!(weights.len(), matrix.n(), "weight dimension mismatch");
    assert_eq!(outputs.len(), m, "output dimension mismatch");

    let unlabeled = matrix.unlabeled_indices();
    let u = unlabeled.len();
    assert_eq!(p.len(), u, "one soft label per unlabeled row expected");

    let mut targets = WeightedTargets::new(matrix, p, config.lambda_u);

    // Virtual rows: [0, m) are the matrix rows (unlabeled ones as positive
    // copies), [m, m + u) the negative copies of the unlabeled rows
    let mut labels = Vec::with_capacity(m + u);
    let mut costs = Vec::with_capacity(m + u);
    for row in &targets.rows {
        let (y, c) = match *row {
            RowTarget::Labeled(y) => (y, targets.labeled_cost),
            RowTarget::Unlabeled { slot, .. } => (1.0, targets.lambda_u_by_u * p[slot]),
        };
        labels.push(y);
        costs.push(c);
    }
    for &pj in p {
        labels.push(-1.0);
        costs.push(targets.lambda_u_by_u * (1.0 - pj));
    }

    let mut virtual_outputs = Vec::with_capacity(m + u);
    virtual_outputs.extend_from_slice(outputs);
    virtual_outputs.extend(unlabeled.iter().map(|&i| outputs[i]));

    let mut phase = EpsilonPhase::initial(warm_start);
    let mut settings = CgSettings {
        lambda: config.lambda,
        epsilon: phase.epsilon(config),
        max_iterations: phase.first_cg_budget(config),
    };

    targets.classify(&virtual_outputs[..m]);
    let mut subset = ActiveSubset::partition(m, |i| targets.is_active(i, virtual_outputs[i]));
    let mut objective = primal_objective(config.lambda, weights, &labels, &costs, &virtual_outputs);
    let mut history = vec![objective];

    let mut weights_bar = vec![0.0; weights.len()];
    let mut outputs_bar = vec![0.0; m + u];

    let mut iterations = 0;
    let status = loop {
        if iterations >= config.mfn_iter_max {
            break MfnStatus::MaxIterations;
        }
        iterations += 1;
        debug!(
            "weighted MFN iteration {iterations} ({} active rows, objective = {objective})",
            subset.active_len()
        );

        weights_bar.copy_from_slice(weights);
        outputs_bar.copy_from_slice(&virtual_outputs);

        let report = solve_active(
            matrix,
            &targets,
            subset.active(),
            &settings,
            &mut weights_bar,
            &mut outputs_bar,
        );
        refresh_outputs(matrix, subset.inactive(), &weights_bar, &mut outputs_bar);
        for (j, &i) in unlabeled.iter().enumerate() {
            outputs_bar[m + j] = outputs_bar[i];
        }
        settings.max_iterations = config.cg_iter_max;

        let optimal = report.status.is_converged()
            && subset
                .active()
                .iter()
                .all(|&i| targets.satisfied(i, true, outputs_bar[i], settings.epsilon))
            && subset
                .inactive()
                .iter()
                .all(|&i| targets.satisfied(i, false, outputs_bar[i], settings.epsilon));

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
            virtual_outputs.copy_from_slice(&outputs_bar);
            objective = primal_objective(config.lambda, weights, &labels, &costs, &virtual_outputs);
            break MfnStatus::Optimal;
        }

        let delta = line_search(
            weights,
            &weights_bar,
            config.lambda,
            &virtual_outputs,
            &outputs_bar,
            &labels,
            &costs,
        );
        debug!("line search delta = {delta}");

        for (w, &wb) in weights.iter_mut().zip(&weights_bar) {
            *w += delta * (wb - *w);
        }
        for (o, &ob) in virtual_outputs.iter_mut().zip(&outputs_bar) {
            *o += delta * (ob - *o);
        }

        targets.classify(&virtual_outputs[..m]);
        subset.repartition(|i| targets.is_active(i, virtual_outputs[i]));

        let previous = objective;
        objective = primal_objective(config.lambda, weights, &labels, &costs, &virtual_outputs);
        history.push(objective);

        if (objective - previous).abs() < config.epsilon {
            break MfnStatus::ObjectiveStalled;
        }
    };

    outputs.copy_from_slice(&virtual_outputs[..m]);
    debug!("weighted MFN finished ({status:?}) in {iterations} iteration(s)");
    MfnOutcome {
        status,
        iterations,
        objective,
        objective_history: history,
    }
}

/// Train a deterministic annealing semi-supervised L2-SVM
///
/// Returns the lowest transductive objective seen; `weights` and `outputs`
/// receive the corresponding solution. The matrix is never modified, so
/// unlabeled rows keep their `0` label.
///
/// # Panics
/// Panics if the vector lengths do not match the matrix.
pub fn da_s3vm(
    matrix: &DesignMatrix,
    config: &OptimizerConfig,
    weights: &mut [f64],
    outputs: &mut [f64],
) -> DaOutcome {
    assert_eq!(weights.len(), matrix.n(), "weight dimension mismatch");
    assert_eq!(outputs.len(), matrix.m(), "output dimension mismatch");

    let unlabeled = matrix.unlabeled_indices();
    let u = unlabeled.len();
    let cost = |w: &[f64], o: &[f64]| {
        transductive_cost(
            norm_square(w),
            matrix.labels(),
            o,
            config.lambda,
            config.lambda_u,
        )
    };

    if u == 0 {
        warn!("DA-S3VM called without unlabeled rows, training a supervised L2-SVM");
        l2_svm_mfn(matrix, config, weights, outputs, false);
        return DaOutcome {
            objective: cost(weights, outputs),
            outer_iterations: 0,
            entropy: 0.0,
        };
    }

    debug!("Initializing weights and soft labels");
    let mut temperature = DA_INIT_TEMP * config.lambda_u;
    let mut p = vec![config.r; u];
    let mut g = vec![0.0; u];
    let mut entropy = mean_entropy(&p);

    optimize_w(matrix, &p, config, weights, outputs, false);
    let mut best_objective = cost(weights, outputs);
    let mut best_weights = weights.to_vec();
    let mut best_outputs = outputs.to_vec();

    let mut outer = 0;
    while outer < DA_OUTER_ITER_MAX && entropy > config.epsilon {
        outer += 1;
        let mut inner = 0;
        let mut kl_divergence = 1.0;

        while inner < DA_INNER_ITER_MAX && kl_divergence > config.epsilon {
            inner += 1;
            let previous = p.clone();
            for (gj, &i) in g.iter_mut().zip(&unlabeled) {
                let o = outputs[i];
                let positive = if o > 1.0 { 0.0 } else { (1.0 - o) * (1.0 - o) };
                let negative = if o < -1.0 { 0.0 } else { (1.0 + o) * (1.0 + o) };
                *gj = config.lambda_u * (positive - negative);
            }

            optimize_p(&g, temperature, config.r, &mut p);
            kl_divergence = mean_kl_divergence(&p, &previous);

            optimize_w(matrix, &p, config, weights, outputs, true);
            let objective = cost(weights, outputs);
            if objective < best_objective {
                best_objective = objective;
                best_weights.copy_from_slice(weights);
                best_outputs.copy_from_slice(outputs);
            }
            debug!(
                "[{outer}.{inner}] T = {temperature}, kl = {kl_divergence}, cost = {objective}"
            );
        }

        entropy = mean_entropy(&p);
        debug!("finished outer iteration {outer}: T = {temperature}, entropy = {entropy}");
        temperature /= DA_ANNEALING_RATE;
    }

    weights.copy_from_slice(&best_weights);
    outputs.copy_from_slice(&best_outputs);
    info!("DA-S3VM (min) objective = {best_objective} after {outer} outer iteration(s)");

    DaOutcome {
        objective: best_objective,
        outer_iterations: outer,
        entropy,
    }
}

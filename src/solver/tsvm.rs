//! Transductive L2-SVM with label switching
//!
//! Unlabeled rows get hard labels from a supervised model, respecting the
//! expected positive fraction. The unlabeled loss weight is then annealed
//! from a small value up to `lambda_u`; at each weight, pairs of unlabeled
//! rows whose swapped labels lower the objective are switched and the model
//! is retrained until no pair is left.

use crate::core::OptimizerConfig;
use crate::data::DesignMatrix;
use crate::solver::line_search::Breakpoint;
use crate::solver::mfn::l2_svm_mfn;
use crate::solver::{TSVM_ANNEALING_RATE, TSVM_LAMBDA_SMALL, TSVM_MAX_SWITCH_ROUNDS};
use crate::utils::{norm_square, transductive_cost};
use log::{debug, info, warn};

/// Train a transductive L2-SVM; returns the total number of label switches
///
/// Labels and costs of `matrix` are used as scratch space while training and
/// are restored before returning: unlabeled rows carry `0` again and every
/// row gets its original cost back. A matrix without unlabeled rows is
/// trained as a plain L2-SVM.
///
/// # Panics
/// Panics if the vector lengths do not match the matrix.
pub fn tsvm_mfn(
    matrix: &mut DesignMatrix,
    config: &OptimizerConfig,
    weights: &mut [f64],
    outputs: &mut [f64],
) -> usize {
    assert_eq!(weights.len(), matrix.n(), "weight dimension mismatch");
    assert_eq!(outputs.len(), matrix.m(), "output dimension mismatch");

    let unlabeled = matrix.unlabeled_indices();
    if unlabeled.is_empty() {
        warn!("TSVM called without unlabeled rows, training a supervised L2-SVM");
        l2_svm_mfn(matrix, config, weights, outputs, false);
        return 0;
    }
    let u = unlabeled.len();
    let l = matrix.m() - u;
    let original_costs = matrix.costs().to_vec();

    debug!("Initializing weights and unknown labels");
    let labeled = matrix.labeled_subset();
    let mut labeled_outputs = labeled.outputs(weights);
    l2_svm_mfn(&labeled, config, weights, &mut labeled_outputs, false);

    let mut lambda_0 = TSVM_LAMBDA_SMALL;
    let mut labeled_iter = labeled_outputs.into_iter();
    for i in 0..matrix.m() {
        if matrix.labels()[i] == 0.0 {
            outputs[i] = matrix.row_dot(i, weights);
            matrix.set_cost(i, lambda_0 / u as f64);
        } else {
            // labeled_subset keeps the row order
            outputs[i] = labeled_iter.next().unwrap_or_default();
            matrix.set_cost(i, 1.0 / l as f64);
        }
    }

    let scores: Vec<f64> = unlabeled.iter().map(|&i| outputs[i]).collect();
    for (&i, label) in unlabeled.iter().zip(initial_labels(&scores, config.r)) {
        matrix.set_label(i, label);
    }

    weights.fill(0.0);
    outputs.fill(0.0);
    l2_svm_mfn(matrix, config, weights, outputs, false);

    let mut num_switches = 0;
    let mut last_round = false;
    while lambda_0 <= config.lambda_u {
        let mut rounds = 0;
        loop {
            let switched = switch_labels(matrix.labels_mut(), outputs, &unlabeled, config.s);
            if switched == 0 {
                break;
            }
            rounds += 1;
            num_switches += switched;
            debug!("lambda_0 = {lambda_0}, round {rounds}: switched {switched} labels");
            l2_svm_mfn(matrix, config, weights, outputs, true);

            if rounds >= TSVM_MAX_SWITCH_ROUNDS {
                warn!(
                    "TSVM: switching did not settle after {rounds} rounds at lambda_0 = {lambda_0}"
                );
                break;
            }
        }
        if last_round {
            break;
        }

        lambda_0 *= TSVM_ANNEALING_RATE;
        if lambda_0 >= config.lambda_u {
            lambda_0 = config.lambda_u;
            last_round = true;
        }
        for &i in &unlabeled {
            matrix.set_cost(i, lambda_0 / u as f64);
        }
        debug!(
            "lambda_0 increased to {:.2}% of lambda_u = {}",
            100.0 * lambda_0 / config.lambda_u,
            config.lambda_u
        );
        l2_svm_mfn(matrix, config, weights, outputs, true);
    }

    for &i in &unlabeled {
        matrix.set_label(i, 0.0);
    }
    matrix.replace_costs(original_costs);

    let objective = transductive_cost(
        norm_square(weights),
        matrix.labels(),
        outputs,
        config.lambda,
        config.lambda_u,
    );
    info!("TSVM finished after {num_switches} switches, objective = {objective}");
    num_switches
}

/// Hard labels for the unlabeled scores: the `round(r * u)` highest scores
/// get `+1`, every other row `-1`
pub fn initial_labels(scores: &[f64], r: f64) -> Vec<f64> {
    let u = scores.len();
    let positives = ((r * u as f64).round() as usize).min(u);
    let mut labels = vec![-1.0; u];
    if positives == 0 {
        return labels;
    }

    let mut order: Vec<usize> = (0..u).collect();
    order.select_nth_unstable_by(positives - 1, |&a, &b| scores[b].total_cmp(&scores[a]));
    for &k in &order[..positives] {
        labels[k] = 1.0;
    }
    labels
}

/// Swap the labels of at most `max_switches` pairs of unlabeled rows
///
/// Candidates are positives inside the margin (`o < 1`, lowest output
/// first) and negatives inside the margin (`-o < 1`, highest output first).
/// The k-th pair is swapped while the positive's output is below the
/// negative's. Returns the number of swapped pairs.
pub fn switch_labels(
    labels: &mut [f64],
    outputs: &[f64],
    unlabeled: &[usize],
    max_switches: usize,
) -> usize {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for &i in unlabeled {
        let o = outputs[i];
        if labels[i] > 0.0 && o < 1.0 {
            positive.push(Breakpoint {
                value: o,
                row: i,
                sign: 0.0,
            });
        }
        if labels[i] < 0.0 && -o < 1.0 {
            negative.push(Breakpoint {
                value: -o,
                row: i,
                sign: 0.0,
            });
        }
    }
    positive.sort_unstable_by(Breakpoint::cmp_value);
    negative.sort_unstable_by(Breakpoint::cmp_value);

    let mut switched = 0;
    for (pos, neg) in positive.iter().zip(&negative) {
        if switched >= max_switches || pos.value >= -neg.value {
            break;
        }
        labels[pos.row] = -1.0;
        labels[neg.row] = 1.0;
        switched += 1;
    }
    switched
}

//! Exact line search for the L2-SVM objective
//!
//! Along the segment `w + delta * (w_bar - w)` the squared hinge objective
//! is piecewise quadratic, so its derivative is piecewise linear. The
//! minimizer is found by walking the breakpoints where rows enter or leave
//! the violated set.

use std::cmp::Ordering;

/// Point along the search direction where a row changes state
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Breakpoint {
    pub value: f64,
    pub row: usize,
    /// -1 when the row leaves the violated set, +1 when it enters
    pub sign: f64,
}

impl Breakpoint {
    pub(crate) fn cmp_value(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value)
    }
}

/// Step size in `[0, 1]`-ish minimizing
///
/// ```text
/// F(d) = 0.5 * lambda * |w + d (w_bar - w)|^2
///      + 0.5 * sum_i C_i * max(0, 1 - y_i (o_i + d (o_bar_i - o_i)))^2
/// ```
///
/// `labels`, `costs`, `outputs` and `outputs_bar` must share one length. A
/// direction along which the slope does not change returns `1.0`.
pub fn line_search(
    weights: &[f64],
    weights_bar: &[f64],
    lambda: f64,
    outputs: &[f64],
    outputs_bar: &[f64],
    labels: &[f64],
    costs: &[f64],
) -> f64 {
    assert_eq!(weights.len(), weights_bar.len(), "weight length mismatch");
    let len = labels.len();
    assert!(
        outputs.len() == len && outputs_bar.len() == len && costs.len() == len,
        "line search vectors must share one length"
    );

    let mut omega_l = 0.0;
    let mut omega_r = 0.0;
    for (&w, &wb) in weights.iter().zip(weights_bar) {
        let diff = wb - w;
        omega_l += w * diff;
        omega_r += wb * diff;
    }

    // Slope at 0 and slope at 1 of the loss over the currently violated rows
    let mut left = lambda * omega_l;
    let mut right = lambda * omega_r;
    for i in 0..len {
        if labels[i] * outputs[i] < 1.0 {
            let diff = costs[i] * (outputs_bar[i] - outputs[i]);
            left += (outputs[i] - labels[i]) * diff;
            right += (outputs_bar[i] - labels[i]) * diff;
        }
    }

    let mut breakpoints = Vec::new();
    for i in 0..len {
        let margin = labels[i] * outputs[i];
        let diff = labels[i] * (outputs_bar[i] - outputs[i]);
        let sign = if margin < 1.0 && diff > 0.0 {
            -1.0
        } else if margin >= 1.0 && diff < 0.0 {
            1.0
        } else {
            continue;
        };
        breakpoints.push(Breakpoint {
            value: (1.0 - margin) / diff,
            row: i,
            sign,
        });
    }
    breakpoints.sort_unstable_by(Breakpoint::cmp_value);

    for bp in &breakpoints {
        if left + bp.value * (right - left) >= 0.0 {
            break;
        }
        let i = bp.row;
        let diff = bp.sign * costs[i] * (outputs_bar[i] - outputs[i]);
        left += diff * (outputs[i] - labels[i]);
        right += diff * (outputs_bar[i] - labels[i]);
    }

    if right == left {
        return 1.0;
    }
    -left / (right - left)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[allow(clippy::too_many_arguments)]
    fn objective(
        delta: f64,
        w: &[f64],
        w_bar: &[f64],
        lambda: f64,
        o: &[f64],
        o_bar: &[f64],
        y: &[f64],
        c: &[f64],
    ) -> f64 {
        let reg: f64 = w
            .iter()
            .zip(w_bar)
            .map(|(&a, &b)| {
                let v = a + delta * (b - a);
                v * v
            })
            .sum();
        let loss: f64 = (0..y.len())
            .map(|i| {
                let out = o[i] + delta * (o_bar[i] - o[i]);
                let slack = (1.0 - y[i] * out).max(0.0);
                c[i] * slack * slack
            })
            .sum();
        0.5 * (lambda * reg + loss)
    }

    #[test]
    fn test_hand_worked_minimizer() {
        // x = 1 and x = 0.5, both positive, w moves from 0 to 2:
        // F'(d) = 9d - 3
        let w = [0.0];
        let w_bar = [2.0];
        let o = [0.0, 0.0];
        let o_bar = [2.0, 1.0];
        let y = [1.0, 1.0];
        let c = [1.0, 1.0];

        let delta = line_search(&w, &w_bar, 1.0, &o, &o_bar, &y, &c);
        assert_relative_eq!(delta, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_minimizer_before_first_kink() {
        // x = 0.5 and x = 1, both positive, w moves from 0 to 4. The kinks sit
        // at d = 1/4 and d = 1/2; up to the first one F'(d) = 36d - 6
        let w = [0.0];
        let w_bar = [4.0];
        let o = [0.0, 0.0];
        let o_bar = [2.0, 4.0];
        let y = [1.0, 1.0];
        let c = [1.0, 1.0];

        let delta = line_search(&w, &w_bar, 1.0, &o, &o_bar, &y, &c);
        assert_relative_eq!(delta, 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_minimizer_past_a_kink() {
        // Same rows with lambda = 1/8: F'(1/4) = -1/2, so the row x = 1 leaves
        // the violated set and the minimizer solves 6d - 2 = 0
        let w = [0.0];
        let w_bar = [4.0];
        let o = [0.0, 0.0];
        let o_bar = [2.0, 4.0];
        let y = [1.0, 1.0];
        let c = [1.0, 1.0];

        let delta = line_search(&w, &w_bar, 0.125, &o, &o_bar, &y, &c);
        assert_relative_eq!(delta, 1.0 / 3.0, epsilon = 1e-12);

        let best = objective(delta, &w, &w_bar, 0.125, &o, &o_bar, &y, &c);
        assert_relative_eq!(best, 1.0 / 6.0, epsilon = 1e-12);
        for kink in [0.25, 0.5] {
            assert!(best < objective(kink, &w, &w_bar, 0.125, &o, &o_bar, &y, &c));
        }
    }

    #[test]
    fn test_minimizer_beats_sampled_steps() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let n = 3;
            let m = 12;
            let rows: Vec<Vec<f64>> = (0..m)
                .map(|_| (0..n).map(|_| rng.random_range(-1.0..1.0)).collect())
                .collect();
            let y: Vec<f64> = (0..m)
                .map(|_| if rng.random_bool(0.5) { 1.0 } else { -1.0 })
                .collect();
            let c: Vec<f64> = (0..m).map(|_| rng.random_range(0.1..2.0)).collect();
            let w: Vec<f64> = (0..n).map(|_| rng.random_range(-2.0..2.0)).collect();
            let w_bar: Vec<f64> = (0..n).map(|_| rng.random_range(-2.0..2.0)).collect();
            let dot = |x: &Vec<f64>, v: &[f64]| x.iter().zip(v).map(|(a, b)| a * b).sum::<f64>();
            let o: Vec<f64> = rows.iter().map(|x| dot(x, &w)).collect();
            let o_bar: Vec<f64> = rows.iter().map(|x| dot(x, &w_bar)).collect();

            // Only descent directions are searched by the solvers
            let f0 = objective(0.0, &w, &w_bar, 0.5, &o, &o_bar, &y, &c);
            if objective(1e-6, &w, &w_bar, 0.5, &o, &o_bar, &y, &c) >= f0 {
                continue;
            }

            let delta = line_search(&w, &w_bar, 0.5, &o, &o_bar, &y, &c);
            assert!(delta > 0.0);
            let best = objective(delta, &w, &w_bar, 0.5, &o, &o_bar, &y, &c);

            for k in 0..=100 {
                let step = 3.0 * k as f64 / 100.0;
                let value = objective(step, &w, &w_bar, 0.5, &o, &o_bar, &y, &c);
                assert!(
                    best <= value + 1e-9,
                    "delta {delta} gives {best}, step {step} gives {value}"
                );
            }
        }
    }

    #[test]
    fn test_degenerate_direction() {
        // w_bar == w and every output unchanged
        let delta = line_search(&[1.0], &[1.0], 1.0, &[2.0], &[2.0], &[1.0], &[1.0]);
        assert_eq!(delta, 1.0);
    }

    #[test]
    fn test_full_step_when_target_is_optimal() {
        // No violated rows at either end; pure regularizer pulls toward w_bar = 0
        let delta = line_search(&[1.0], &[0.0], 1.0, &[3.0], &[3.0], &[1.0], &[1.0]);
        assert_relative_eq!(delta, 1.0, epsilon = 1e-12);
    }
}

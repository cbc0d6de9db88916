//! Soft label update for deterministic annealing
//!
//! Finds the multiplier `nu` of the mean constraint
//!
//! ```text
//! B(nu) = mean_i sigma((g_i - nu) / T) - r = 0,   sigma(x) = 1 / (1 + e^x)
//! ```
//!
//! with Newton steps safeguarded by bisection, and writes the resulting soft
//! labels `p_i = sigma((g_i - nu) / T)`.

use log::{debug, warn};

const ROOT_TOLERANCE: f64 = 1e-10;
const ROOT_MAX_ITER: usize = 500;

/// Result of the root search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOutcome {
    /// Final multiplier
    pub nu: f64,
    /// `B(nu)` at the final multiplier
    pub residual: f64,
    pub iterations: usize,
    /// Whether `|B(nu)|` reached the tolerance
    pub converged: bool,
}

/// Solve for the soft labels `p` with mean `r` at temperature `temperature`
///
/// `p` is written even when the tolerance is not reached; a warning is
/// logged in that case.
///
/// # Panics
/// Panics if `g` and `p` differ in length, `temperature` is not positive or
/// `r` lies outside `(0, 1)`.
pub fn optimize_p(g: &[f64], temperature: f64, r: f64, p: &mut [f64]) -> RootOutcome {
    assert_eq!(g.len(), p.len(), "gradient/probability length mismatch");
    assert!(temperature > 0.0, "temperature must be positive");
    assert!(r > 0.0 && r < 1.0, "positive fraction must lie in (0, 1)");

    if g.is_empty() {
        return RootOutcome {
            nu: 0.0,
            residual: 0.0,
            iterations: 0,
            converged: true,
        };
    }

    let shift = temperature * ((1.0 - r) / r).ln();
    let (g_min, g_max) = g
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    // B <= 0 at the lower end and B >= 0 at the upper end
    let mut nu_minus = g_min - shift;
    let mut nu_plus = g_max - shift;

    let mut nu = 0.5 * (nu_minus + nu_plus);
    let (mut residual, mut slope) = constraint(g, temperature, r, nu);

    let mut iterations = 0;
    while residual.abs() > ROOT_TOLERANCE && iterations < ROOT_MAX_ITER {
        iterations += 1;

        if residual < 0.0 {
            nu_minus = nu;
        } else {
            nu_plus = nu;
        }
        if nu_plus - nu_minus < ROOT_TOLERANCE {
            break;
        }

        let newton = if slope > 0.0 {
            nu - residual / slope
        } else {
            f64::NAN
        };
        nu = if newton > nu_minus && newton < nu_plus {
            newton
        } else {
            0.5 * (nu_minus + nu_plus)
        };

        (residual, slope) = constraint(g, temperature, r, nu);
    }

    let converged = residual.abs() <= ROOT_TOLERANCE;
    if converged {
        debug!("optimize_p: nu = {nu} after {iterations} iteration(s)");
    } else {
        warn!(
            "optimize_p: root not found to required precision (|B| = {:e})",
            residual.abs()
        );
    }

    for (pi, &gi) in p.iter_mut().zip(g) {
        *pi = sigma((gi - nu) / temperature);
    }

    RootOutcome {
        nu,
        residual,
        iterations,
        converged,
    }
}

/// `1 / (1 + e^x)`; an overflowing exponent gives 0
fn sigma(x: f64) -> f64 {
    let s = x.exp();
    if s.is_infinite() {
        0.0
    } else {
        1.0 / (1.0 + s)
    }
}

/// `B(nu)` and its derivative
fn constraint(g: &[f64], temperature: f64, r: f64, nu: f64) -> (f64, f64) {
    let mut value = 0.0;
    let mut slope = 0.0;
    for &gi in g {
        let s = ((gi - nu) / temperature).exp();
        if !s.is_infinite() {
            let t = 1.0 / (1.0 + s);
            value += t;
            slope += s * t * t;
        }
    }
    let u = g.len() as f64;
    (value / u - r, slope / (temperature * u))
}

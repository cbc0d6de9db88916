//! Linear solvers for supervised and semi-supervised L2-SVMs
//!
//! The modified finite Newton method and its semi-supervised extensions
//! follow "A Modified Finite Newton Method for Fast Solution of Large Scale
//! Linear SVMs" (Keerthi & DeCoste) and "Large Scale Semi-supervised Linear
//! SVMs" (Sindhwani & Keerthi).

pub mod active_set;
pub mod cgls;
pub mod das3vm;
pub mod line_search;
pub mod mfn;
pub mod root;
pub mod tsvm;

pub use self::active_set::ActiveSubset;
pub use self::cgls::{cgls, solve_active, CgReport, CgSettings};
pub use self::das3vm::{da_s3vm, optimize_w, UnlabeledRegime};
pub use self::line_search::line_search;
pub use self::mfn::{l2_svm_mfn, EpsilonPhase};
pub use self::root::{optimize_p, RootOutcome};
pub use self::tsvm::{switch_labels, tsvm_mfn};

/// Coarse tolerance used for the first pass of a cold start
pub const BIG_EPSILON: f64 = 0.01;
/// CG budget of the first Newton step of a cold start
pub const SMALL_CG_ITER_MAX: usize = 10;
/// Relative objective change that ends a Newton run
pub const RELATIVE_STOP_EPS: f64 = 1e-9;

pub const TSVM_ANNEALING_RATE: f64 = 1.5;
/// Starting weight of the unlabeled loss in TSVM
pub const TSVM_LAMBDA_SMALL: f64 = 1e-5;
/// Upper bound on switch/retrain rounds at one unlabeled weight
pub const TSVM_MAX_SWITCH_ROUNDS: usize = 1000;

pub const DA_ANNEALING_RATE: f64 = 1.5;
/// Starting temperature, as a multiple of lambda_u
pub const DA_INIT_TEMP: f64 = 10.0;
pub const DA_INNER_ITER_MAX: usize = 100;
pub const DA_OUTER_ITER_MAX: usize = 30;

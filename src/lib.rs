//! Linear L2-SVM solvers for supervised and semi-supervised learning
//!
//! Based on "Large Scale Semi-supervised Linear SVMs" by Vikas Sindhwani and
//! S. Sathiya Keerthi: regularized least squares (CGLS), the modified finite
//! Newton L2-SVM, the transductive SVM with label switching and the
//! deterministic annealing semi-supervised SVM.

pub mod api;
pub mod core;
pub mod data;
pub mod optimizer;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, ModelInfo, TrainedModel, SSL};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{DesignMatrix, LibSVMDataset};
pub use crate::optimizer::{train, SSLOptimizer, TrainedLinearModel};
pub use crate::utils::MatrixStats;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

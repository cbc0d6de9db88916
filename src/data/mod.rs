//! Data loading and the sparse design matrix
//!
//! The solvers operate on [`DesignMatrix`]; [`LibSVMDataset`] reads the
//! libsvm text format and converts into it.

pub mod libsvm;
pub mod matrix;

pub use self::libsvm::*;
pub use self::matrix::*;

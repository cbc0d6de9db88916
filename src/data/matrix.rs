//! Compressed sparse row design matrix
//!
//! Rows are examples, columns are features. An optional constant bias
//! feature is modelled as one extra trailing column that is never stored,
//! so the weight dimension `n()` is `n_features() + 1` when a bias is set.
//! Labels and costs live next to the rows; a label of `0.0` marks an
//! unlabeled row.

use crate::core::{Dataset, Result, SSLError, Sample, TargetSource};

/// Sparse row-major matrix with per-row label and cost
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    n_features: usize,
    bias: f64,
    values: Vec<f64>,
    col_indices: Vec<usize>,
    row_ptr: Vec<usize>,
    labels: Vec<f64>,
    costs: Vec<f64>,
    n_unlabeled: usize,
}

impl DesignMatrix {
    /// Build a matrix from raw CSR arrays
    ///
    /// `costs` defaults to `1/m` for every row.
    pub fn new(
        n_features: usize,
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
        labels: Vec<f64>,
        costs: Option<Vec<f64>>,
    ) -> Result<Self> {
        let m = labels.len();
        if m == 0 {
            return Err(SSLError::EmptyDataset);
        }
        if row_ptr.len() != m + 1 {
            return Err(SSLError::DimensionMismatch {
                expected: m + 1,
                actual: row_ptr.len(),
            });
        }
        if col_indices.len() != values.len() {
            return Err(SSLError::DimensionMismatch {
                expected: values.len(),
                actual: col_indices.len(),
            });
        }
        if row_ptr[0] != 0 || row_ptr[m] != values.len() {
            return Err(SSLError::InvalidDataset(format!(
                "row pointers must span [0, {}], got [{}, {}]",
                values.len(),
                row_ptr[0],
                row_ptr[m]
            )));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(SSLError::InvalidDataset(
                "row pointers must be non-decreasing".to_string(),
            ));
        }
        if let Some(&col) = col_indices.iter().find(|&&c| c >= n_features) {
            return Err(SSLError::InvalidDataset(format!(
                "column index {col} out of range for {n_features} features"
            )));
        }
        if let Some(&y) = labels.iter().find(|y| !y.is_finite()) {
            return Err(SSLError::InvalidLabel(y));
        }

        let costs = match costs {
            Some(costs) => {
                check_costs(&costs, m)?;
                costs
            }
            None => vec![1.0 / m as f64; m],
        };

        let n_unlabeled = labels.iter().filter(|&&y| y == 0.0).count();

        Ok(Self {
            n_features,
            bias: 0.0,
            values,
            col_indices,
            row_ptr,
            labels,
            costs,
            n_unlabeled,
        })
    }

    /// Build a matrix from samples; features at or beyond `n_features` are rejected
    pub fn from_samples(samples: &[Sample], n_features: usize) -> Result<Self> {
        let nnz: usize = samples.iter().map(|s| s.features.nnz()).sum();
        let mut row_ptr = Vec::with_capacity(samples.len() + 1);
        let mut col_indices = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        let mut labels = Vec::with_capacity(samples.len());

        row_ptr.push(0);
        for sample in samples {
            col_indices.extend_from_slice(&sample.features.indices);
            values.extend_from_slice(&sample.features.values);
            row_ptr.push(values.len());
            labels.push(sample.label);
        }

        Self::new(n_features, row_ptr, col_indices, values, labels, None)
    }

    /// Build a matrix from any dataset
    pub fn from_dataset<D: Dataset>(dataset: &D) -> Result<Self> {
        let samples: Vec<Sample> = (0..dataset.len()).map(|i| dataset.get_sample(i)).collect();
        Self::from_samples(&samples, dataset.dim())
    }

    /// Append a constant bias column with the given value (0 removes it)
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Replace the per-row costs, which must be finite and non-negative
    pub fn with_costs(mut self, costs: Vec<f64>) -> Result<Self> {
        check_costs(&costs, self.m())?;
        self.costs = costs;
        Ok(self)
    }

    /// Weight dimension including the bias column
    pub fn n(&self) -> usize {
        if self.has_bias() {
            self.n_features + 1
        } else {
            self.n_features
        }
    }

    /// Number of stored feature columns
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Total number of rows
    pub fn m(&self) -> usize {
        self.labels.len()
    }

    /// Number of labeled rows
    pub fn l(&self) -> usize {
        self.m() - self.n_unlabeled
    }

    /// Number of unlabeled rows, fixed at construction
    pub fn u(&self) -> usize {
        self.n_unlabeled
    }

    /// Number of stored non-zeros
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn has_bias(&self) -> bool {
        self.bias != 0.0
    }

    /// Bias feature value, `None` when the bias column is disabled
    pub fn bias(&self) -> Option<f64> {
        self.has_bias().then_some(self.bias)
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn label(&self, i: usize) -> f64 {
        self.labels[i]
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Column indices and values of row `i`
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_indices[range.clone()], &self.values[range])
    }

    /// Dot product of row `i` with a dense weight vector of length `n()`
    pub fn row_dot(&self, i: usize, w: &[f64]) -> f64 {
        debug_assert_eq!(w.len(), self.n(), "weight dimension mismatch");
        let (cols, vals) = self.row(i);
        let mut t: f64 = cols.iter().zip(vals).map(|(&j, &v)| v * w[j]).sum();
        if self.has_bias() {
            t += self.bias * w[self.n_features];
        }
        t
    }

    /// `dense += scale * x_i`
    pub fn add_scaled_row(&self, i: usize, scale: f64, dense: &mut [f64]) {
        debug_assert_eq!(dense.len(), self.n(), "dense dimension mismatch");
        let (cols, vals) = self.row(i);
        for (&j, &v) in cols.iter().zip(vals) {
            dense[j] += scale * v;
        }
        if self.has_bias() {
            dense[self.n_features] += scale * self.bias;
        }
    }

    /// Decision values of every row
    pub fn outputs(&self, w: &[f64]) -> Vec<f64> {
        (0..self.m()).map(|i| self.row_dot(i, w)).collect()
    }

    /// Indices of rows that currently carry the unlabeled sentinel
    pub fn unlabeled_indices(&self) -> Vec<usize> {
        (0..self.m()).filter(|&i| self.labels[i] == 0.0).collect()
    }

    /// Copy of the labeled rows only, each with cost `1/l`
    pub fn labeled_subset(&self) -> DesignMatrix {
        let labeled: Vec<usize> = (0..self.m()).filter(|&i| self.labels[i] != 0.0).collect();
        let l = labeled.len();

        let mut row_ptr = Vec::with_capacity(l + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        let mut labels = Vec::with_capacity(l);
        row_ptr.push(0);
        for &i in &labeled {
            let (cols, vals) = self.row(i);
            col_indices.extend_from_slice(cols);
            values.extend_from_slice(vals);
            row_ptr.push(values.len());
            labels.push(self.labels[i]);
        }

        DesignMatrix {
            n_features: self.n_features,
            bias: self.bias,
            values,
            col_indices,
            row_ptr,
            labels,
            costs: vec![1.0 / l as f64; l],
            n_unlabeled: 0,
        }
    }

    pub(crate) fn set_label(&mut self, i: usize, label: f64) {
        self.labels[i] = label;
    }

    pub(crate) fn labels_mut(&mut self) -> &mut [f64] {
        &mut self.labels
    }

    pub(crate) fn set_cost(&mut self, i: usize, cost: f64) {
        self.costs[i] = cost;
    }

    pub(crate) fn replace_costs(&mut self, costs: Vec<f64>) {
        assert_eq!(costs.len(), self.m(), "cost vector length mismatch");
        self.costs = costs;
    }
}

/// One cost per row, each finite and non-negative
fn check_costs(costs: &[f64], m: usize) -> Result<()> {
    if costs.len() != m {
        return Err(SSLError::DimensionMismatch {
            expected: m,
            actual: costs.len(),
        });
    }
    if costs.iter().any(|c| !(c.is_finite() && *c >= 0.0)) {
        return Err(SSLError::InvalidDataset(
            "costs must be finite and non-negative".to_string(),
        ));
    }
    Ok(())
}

impl TargetSource for DesignMatrix {
    fn label(&self, row: usize) -> f64 {
        self.labels[row]
    }

    fn cost(&self, row: usize) -> f64 {
        self.costs[row]
    }
}

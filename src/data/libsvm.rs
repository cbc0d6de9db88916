//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! A label of `0` marks an unlabeled row, so the same file can carry the
//! labeled and the unlabeled part of a semi-supervised problem:
//! +1 1:0.5 3:1.2 7:0.8
//! 0 2:0.3 5:2.1
//! -1 1:0.1 2:0.7

use crate::core::{Dataset, Result, SSLError, Sample, SparseVector};
use crate::data::DesignMatrix;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset implementation for LibSVM format files
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    samples: Vec<Sample>,
    dimensions: usize,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SSLError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut samples = Vec::new();
        let mut dimensions = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SSLError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (sample, max_idx) = Self::parse_line(line).map_err(|e| {
                SSLError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            if let Some(max_idx) = max_idx {
                dimensions = dimensions.max(max_idx + 1);
            }
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(SSLError::EmptyDataset);
        }

        Ok(LibSVMDataset {
            samples,
            dimensions,
        })
    }

    /// Build the CSR design matrix for this dataset
    pub fn to_design_matrix(&self) -> Result<DesignMatrix> {
        DesignMatrix::from_samples(&self.samples, self.dimensions)
    }

    /// Rows in file order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Parse a single line; returns the sample and its largest 0-based index
    fn parse_line(line: &str) -> Result<(Sample, Option<usize>)> {
        let mut parts = line.split_whitespace();

        let label_str = parts
            .next()
            .ok_or_else(|| SSLError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| SSLError::ParseError(format!("Invalid label: {label_str}")))?;

        let mut indices = Vec::new();
        let mut values = Vec::new();

        for feature_str in parts {
            let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
                SSLError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index_str.parse::<usize>().map_err(|_| {
                SSLError::ParseError(format!("Invalid feature index: {index_str}"))
            })?;
            let value = value_str.parse::<f64>().map_err(|_| {
                SSLError::ParseError(format!("Invalid feature value: {value_str}"))
            })?;

            // libsvm uses 1-based indexing
            if index == 0 {
                return Err(SSLError::ParseError(format!(
                    "Feature index must be positive: {index}"
                )));
            }

            indices.push(index - 1);
            values.push(value);
        }

        let max_index = indices.iter().copied().max();
        let sample = Sample::new(SparseVector::new(indices, values), label);
        Ok((sample, max_index))
    }
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn get_sample(&self, i: usize) -> Sample {
        self.samples[i].clone()
    }

    fn get_labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

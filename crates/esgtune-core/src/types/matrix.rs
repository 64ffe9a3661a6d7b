//! Dense row-major matrices for label and probability data.
//!
//! Rows are samples (documents or chunks), columns are labels.

use crate::error::{EsgError, Result};

/// A dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

/// Binary ground-truth labels.
pub type LabelMatrix = Matrix<u8>;

/// Per-label probabilities in `[0, 1]`.
pub type ProbMatrix = Matrix<f64>;

impl<T: Copy> Matrix<T> {
    /// Build from rows that must all be `cols` wide.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R], cols: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != cols {
                return Err(EsgError::RaggedMatrix {
                    row,
                    expected: cols,
                    actual: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy of one column.
    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.rows).map(|row| self.get(row, col)).collect()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Apply `f` to every cell.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            data: self.data.iter().map(|&v| f(v)).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Apply `f(column, value)` to every cell.
    pub fn map_columns<U: Copy>(&self, f: impl Fn(usize, T) -> U) -> Matrix<U> {
        Matrix {
            data: self
                .data
                .iter()
                .enumerate()
                .map(|(i, &v)| f(i % self.cols, v))
                .collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl LabelMatrix {
    /// Build a label matrix, checking the width against `num_labels` and
    /// that every cell is binary.
    pub fn from_label_rows<R: AsRef<[u8]>>(rows: &[R], num_labels: usize) -> Result<Self> {
        if let Some(first) = rows.first() {
            let width = first.as_ref().len();
            if width != num_labels {
                return Err(EsgError::LabelWidth {
                    expected: num_labels,
                    actual: width,
                });
            }
        }
        let matrix = Self::from_rows(rows, num_labels)?;
        if let Some(pos) = matrix.data.iter().position(|&v| v > 1) {
            return Err(EsgError::NonBinaryLabel {
                index: pos % num_labels,
                value: i64::from(matrix.data[pos]),
            });
        }
        Ok(matrix)
    }
}

use crate::error::{Error, Result};
use crate::utils::ZeroOut;

use rand::Rng;
use rand_distr::Distribution;
use rayon::slice::{Chunks, ChunksMut};
use rayon::prelude::*;

/// A dense `rows x cols` matrix of layer weights.
///
/// Row `i` is an input and column `o` is an output neuron. Every column is
/// stored contiguously, so the weights owned by one neuron form a single
/// slice that can be handed to a task on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>, // column-major array
}

impl Mat {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Mat {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Draws every element independently from `distribution`.
    ///
    /// Draws are taken in row-major order so that a seeded generator fills a
    /// matrix in the same order as its checkpoint layout.
    pub fn random<D, R>(distribution: &D, rng: &mut R, rows: usize, cols: usize) -> Self
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        let mut mat = Mat::zeros(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                mat.set(row, col, distribution.sample(rng));
            }
        }
        mat
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[col * self.rows + row]
    }

    #[inline(always)]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[col * self.rows + row] = value;
    }

    /// Returns the weights feeding output neuron `col`.
    pub fn column(&self, col: usize) -> &[f64] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    /// A parallel iterator over the columns, one item per output neuron.
    pub fn par_columns(&self) -> Chunks<'_, f64> {
        self.data.par_chunks(self.rows)
    }

    /// A parallel iterator over disjoint mutable columns.
    pub fn par_columns_mut(&mut self) -> ChunksMut<'_, f64> {
        self.data.par_chunks_mut(self.rows)
    }

    /// Iterates over the elements in row-major order.
    pub fn iter_row_major(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| self.get(row, col)))
    }

    /// Overwrites the matrix from a row-major slice of exactly `len()`
    /// values.
    pub fn copy_from_row_major(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(Error::State(format!(
                "expected {} weights for a {}x{} matrix, got {}",
                self.len(),
                self.rows,
                self.cols,
                values.len()
            )));
        }
        for row in 0..self.rows {
            for col in 0..self.cols {
                self.set(row, col, values[row * self.cols + col]);
            }
        }
        Ok(())
    }
}

impl ZeroOut for Mat {
    fn zero_out(&mut self) {
        self.data.zero_out();
    }
}

// Windowed co-occurrence accumulation.
//
// Every window of `n` contiguous tokens spreads one unit of weight over its
// positions. Each in-vocabulary position adds 1/n to its token's frequency,
// and every ordered pair of in-vocabulary positions (a position paired with
// itself included) adds 1/n to the matching matrix cell. The matrix is
// symmetric by construction. Out-of-vocabulary tokens take no part.
//
// Accumulation is single-threaded and runs document by document after the
// corpus has been collected.

use std::collections::HashMap;

use nalgebra::DMatrix;
use tracing::debug;

use crate::corpus::document::{Corpus, Document};
use crate::embeddings::table::EmbeddingTable;
use crate::error::{InductionError, Result};

/// Square sparse matrix stored as one hash map per row.
#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    rows: Vec<HashMap<usize, f64>>,
}

impl SparseMatrix {
    /// An all-zero `dim`×`dim` matrix.
    pub fn new(dim: usize) -> Self {
        Self {
            rows: vec![HashMap::new(); dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    /// Number of stored (nonzero) cells.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(HashMap::len).sum()
    }

    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        *self.rows[i].entry(j).or_insert(0.0) += value;
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows
            .get(i)
            .and_then(|row| row.get(&j))
            .copied()
            .unwrap_or(0.0)
    }

    /// Stored cells of row `i` as (column, value), in no particular order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows[i].iter().map(|(&j, &v)| (j, v))
    }

    /// `(self × dense)` restricted to the listed rows, in the order given.
    ///
    /// Returns a `rows.len()` × `dense.ncols()` matrix.
    pub fn mul_dense_rows(&self, rows: &[usize], dense: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if dense.nrows() != self.dim() {
            return Err(InductionError::DimensionMismatch {
                expected: self.dim(),
                got: dense.nrows(),
            });
        }

        let mut out = DMatrix::zeros(rows.len(), dense.ncols());
        for (k, &i) in rows.iter().enumerate() {
            for (j, weight) in self.row(i) {
                for c in 0..dense.ncols() {
                    out[(k, c)] += weight * dense[(j, c)];
                }
            }
        }
        Ok(out)
    }
}

/// Co-occurrence matrix and frequency vector over the table's vocabulary.
#[derive(Debug, Clone)]
pub struct Cooccurrence {
    pub matrix: SparseMatrix,
    pub frequencies: Vec<f64>,
    /// Number of windows that were scanned.
    pub windows: usize,
}

/// Accumulates co-occurrence statistics one document at a time.
pub struct Accumulator<'a> {
    table: &'a EmbeddingTable,
    window: usize,
    increment: f64,
    matrix: SparseMatrix,
    frequencies: Vec<f64>,
    windows: usize,
}

impl<'a> Accumulator<'a> {
    pub fn new(table: &'a EmbeddingTable, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(InductionError::InvalidWindow(window));
        }
        Ok(Self {
            table,
            window,
            increment: 1.0 / window as f64,
            matrix: SparseMatrix::new(table.len()),
            frequencies: vec![0.0; table.len()],
            windows: 0,
        })
    }

    pub fn add_document(&mut self, document: &Document) {
        let indices: Vec<Option<usize>> = document
            .tokens()
            .iter()
            .map(|t| self.table.index(t))
            .collect();

        let mut present = Vec::with_capacity(self.window);
        for window in indices.windows(self.window) {
            present.clear();
            present.extend(window.iter().flatten().copied());

            for &i in &present {
                self.frequencies[i] += self.increment;
                for &j in &present {
                    self.matrix.add(i, j, self.increment);
                }
            }
            self.windows += 1;
        }
    }

    pub fn finish(self) -> Cooccurrence {
        debug!(
            windows = self.windows,
            nonzero = self.matrix.nnz(),
            "Co-occurrence accumulation finished"
        );
        Cooccurrence {
            matrix: self.matrix,
            frequencies: self.frequencies,
            windows: self.windows,
        }
    }
}

/// Accumulate co-occurrence statistics for a whole corpus.
pub fn accumulate(corpus: &Corpus, table: &EmbeddingTable, window: usize) -> Result<Cooccurrence> {
    let mut acc = Accumulator::new(table, window)?;
    for document in corpus {
        acc.add_document(document);
    }
    Ok(acc.finish())
}

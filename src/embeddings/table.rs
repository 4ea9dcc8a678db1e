// In-memory embedding table.
//
// Rows are stored row-major in one flat buffer so `embed` can hand out a
// slice of the live row. The token map is bijective onto 0..len: a token that
// appears twice in a file keeps its first row and the repeat is skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::DMatrix;
use tracing::{info, warn};

use super::reader::{read_embeddings, EmbeddingVisitor, Layout, MAX_DIMENSION};
use crate::error::{InductionError, Result};

/// Upper bounds on what an untrusted header may reserve up front.
const MAX_PREALLOCATED_ROWS: usize = 1 << 20;
const MAX_PREALLOCATED_VALUES: usize = 1 << 24;

/// Pretrained word vectors: V rows of dimension D, addressable by token.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dimension: usize,
    values: Vec<f32>,
    tokens: Vec<String>,
    vocab: HashMap<String, usize>,
    placeholder: Vec<f32>,
}

impl EmbeddingTable {
    /// Load a table from disk. `.bin` files use the binary layout, anything
    /// else the text layout.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let layout = Layout::from_path(path);
        let table = Self::from_reader(&mut BufReader::new(file), layout)?;

        info!(
            path = %path.display(),
            words = table.len(),
            dimension = table.dimension(),
            "Loaded embedding table"
        );

        Ok(table)
    }

    pub fn from_reader<R: BufRead>(reader: &mut R, layout: Layout) -> Result<Self> {
        let mut builder = TableBuilder::default();
        read_embeddings(reader, layout, &mut builder)?;
        Ok(builder.finish())
    }

    /// Build a table directly from (token, vector) pairs.
    pub fn from_entries<I, S>(dimension: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: AsRef<str>,
    {
        let mut builder = TableBuilder::default();
        builder.head(0, dimension)?;
        for (token, vector) in entries {
            builder.embed(token.as_ref(), vector)?;
        }
        Ok(builder.finish())
    }

    /// Number of rows (vocabulary size).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn index(&self, token: &str) -> Option<usize> {
        self.vocab.get(token).copied()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Row `index` of the table. Panics if out of range.
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimension;
        &self.values[start..start + self.dimension]
    }

    /// The vector for `token`, or `None` if it is not in the vocabulary.
    pub fn embed(&self, token: &str) -> Option<&[f32]> {
        self.index(token).map(|i| self.row(i))
    }

    /// Unweighted centroid of every row, substituted for out-of-vocabulary
    /// context tokens. All zeros for an empty table.
    pub fn placeholder(&self) -> &[f32] {
        &self.placeholder
    }

    /// Copy the table into a dense V×D f64 matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), self.dimension, |i, j| {
            self.values[i * self.dimension + j] as f64
        })
    }
}

#[derive(Default)]
struct TableBuilder {
    dimension: usize,
    values: Vec<f32>,
    tokens: Vec<String>,
    vocab: HashMap<String, usize>,
}

impl TableBuilder {
    fn finish(self) -> EmbeddingTable {
        let mut centroid = vec![0.0_f64; self.dimension];
        for row in self.values.chunks_exact(self.dimension.max(1)) {
            for (sum, &v) in centroid.iter_mut().zip(row) {
                *sum += v as f64;
            }
        }
        let n = self.tokens.len().max(1) as f64;
        let placeholder = centroid.into_iter().map(|sum| (sum / n) as f32).collect();

        EmbeddingTable {
            dimension: self.dimension,
            values: self.values,
            tokens: self.tokens,
            vocab: self.vocab,
            placeholder,
        }
    }
}

impl EmbeddingVisitor for TableBuilder {
    fn head(&mut self, word_count: usize, dimension: usize) -> Result<()> {
        if dimension > MAX_DIMENSION {
            return Err(InductionError::Format(format!(
                "vector dimension {dimension} exceeds the limit of {MAX_DIMENSION}"
            )));
        }
        self.dimension = dimension;
        let rows = word_count.min(MAX_PREALLOCATED_ROWS);
        self.tokens.reserve(rows);
        self.values
            .reserve(rows.saturating_mul(dimension).min(MAX_PREALLOCATED_VALUES));
        Ok(())
    }

    fn embed(&mut self, token: &str, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(InductionError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        if self.vocab.contains_key(token) {
            warn!(token, "Duplicate token in embedding table, keeping the first row");
            return Ok(());
        }

        self.vocab.insert(token.to_string(), self.tokens.len());
        self.tokens.push(token.to_string());
        self.values.extend_from_slice(&vector);
        Ok(())
    }
}

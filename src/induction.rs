// The learned induction map and vector synthesis.
//
// An induction matrix W (D×D) maps the average embedding of a word's context
// tokens into the embedding space: induced = context · W. This is what lets a
// word with no pretrained vector get one from a handful of occurrences.

use nalgebra::DMatrix;

use crate::embeddings::table::EmbeddingTable;
use crate::error::{InductionError, Result};

/// Linear map from averaged context embeddings to embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct InductionMatrix {
    matrix: DMatrix<f64>,
}

impl InductionMatrix {
    pub fn new(matrix: DMatrix<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn into_inner(self) -> DMatrix<f64> {
        self.matrix
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Map a context vector through the matrix (`context · W`).
    pub fn apply(&self, context: &[f64]) -> Result<Vec<f64>> {
        if context.len() != self.nrows() {
            return Err(InductionError::DimensionMismatch {
                expected: self.nrows(),
                got: context.len(),
            });
        }
        Ok(self.project(context))
    }

    /// `context · W` without the length check; callers guarantee the shape.
    pub(crate) fn project(&self, context: &[f64]) -> Vec<f64> {
        (0..self.ncols())
            .map(|j| {
                context
                    .iter()
                    .enumerate()
                    .map(|(i, &x)| x * self.matrix[(i, j)])
                    .sum()
            })
            .collect()
    }
}

/// Average embedding of `tokens`, using the table's placeholder for tokens
/// outside the vocabulary. All zeros when `tokens` is empty.
pub fn context_average<S: AsRef<str>>(table: &EmbeddingTable, tokens: &[S]) -> Vec<f64> {
    let mut sum = vec![0.0_f64; table.dimension()];
    for token in tokens {
        let vector = table
            .embed(token.as_ref())
            .unwrap_or_else(|| table.placeholder());
        for (s, &v) in sum.iter_mut().zip(vector) {
            *s += v as f64;
        }
    }
    if !tokens.is_empty() {
        let n = tokens.len() as f64;
        for s in &mut sum {
            *s /= n;
        }
    }
    sum
}

/// Induce a vector for a word from the tokens that surround it.
///
/// `context` is every token seen around the word, across all of its
/// occurrences. Tokens outside the vocabulary fall back to the placeholder.
pub fn induce<S: AsRef<str>>(
    table: &EmbeddingTable,
    matrix: &InductionMatrix,
    context: &[S],
) -> Result<Vec<f64>> {
    if context.is_empty() {
        return Err(InductionError::Degenerate(
            "cannot induce a vector from an empty context".to_string(),
        ));
    }
    matrix.apply(&context_average(table, context))
}

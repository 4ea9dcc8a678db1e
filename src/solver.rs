// Least-squares fit of the induction matrix.
//
// Rows of the vocabulary with no observed context weight are masked out. For
// the rest, the co-occurrence row times the embedding table, divided by the
// row's frequency, is the average context embedding C[k]. We then look for W
// minimizing ‖C·W − E‖ over the selected rows, using the pseudo-inverse from
// a singular value decomposition: C = U·S·Vᵗ, W = V·S⁺·Uᵗ·E.
//
// Singular values at or below eps·σ_max·max(rows, cols) count as zero, so a
// rank-deficient C yields the minimum-norm solution instead of blowing up.

use nalgebra::{DMatrix, SVD};
use tracing::{debug, info};

use crate::cooccurrence::SparseMatrix;
use crate::embeddings::table::EmbeddingTable;
use crate::error::{InductionError, Result};
use crate::induction::InductionMatrix;
use crate::mask::Mask;

/// Fit the induction matrix from co-occurrence statistics.
pub fn fit(
    cooccurrence: &SparseMatrix,
    table: &EmbeddingTable,
    frequencies: &[f64],
) -> Result<InductionMatrix> {
    for got in [cooccurrence.dim(), frequencies.len()] {
        if got != table.len() {
            return Err(InductionError::DimensionMismatch {
                expected: table.len(),
                got,
            });
        }
    }

    let selection = select_supported(frequencies);
    let selected: Vec<usize> = selection.iter_ones().collect();
    if selected.is_empty() {
        return Err(InductionError::Degenerate(
            "no vocabulary entry occurs in any window; the corpus and the embeddings share no vocabulary"
                .to_string(),
        ));
    }

    let embeddings = table.to_matrix();
    let mut context = cooccurrence.mul_dense_rows(&selected, &embeddings)?;
    for (k, &row) in selected.iter().enumerate() {
        let frequency = frequencies[row];
        for value in context.row_mut(k).iter_mut() {
            *value /= frequency;
        }
    }
    let targets = embeddings.select_rows(selected.iter());

    info!(
        vocabulary = table.len(),
        selected = selected.len(),
        dimension = table.dimension(),
        "Fitting induction matrix"
    );

    solve_least_squares(context, &targets).map(InductionMatrix::new)
}

/// Mask of vocabulary rows with a positive frequency.
pub fn select_supported(frequencies: &[f64]) -> Mask {
    let mut mask = Mask::with_capacity(frequencies.len());
    for (i, &f) in frequencies.iter().enumerate() {
        mask.set(i, f > 0.0);
    }
    mask
}

/// Minimum-norm least-squares solution W of `context · W ≈ targets`.
pub fn solve_least_squares(context: DMatrix<f64>, targets: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (rows, cols) = context.shape();
    if rows == 0 || cols == 0 {
        return Err(InductionError::Degenerate(format!(
            "cannot decompose an empty {rows}x{cols} design matrix"
        )));
    }
    if targets.nrows() != rows {
        return Err(InductionError::DimensionMismatch {
            expected: rows,
            got: targets.nrows(),
        });
    }

    let svd = SVD::try_new(context, true, true, f64::EPSILON, 0).ok_or_else(|| {
        InductionError::Degenerate("singular value decomposition did not converge".to_string())
    })?;
    let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
        return Err(InductionError::Degenerate(
            "singular value decomposition returned no singular vectors".to_string(),
        ));
    };

    let sigma_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    let cutoff = f64::EPSILON * sigma_max * rows.max(cols) as f64;
    let inverse: Vec<f64> = svd
        .singular_values
        .iter()
        .map(|&s| if s > cutoff { 1.0 / s } else { 0.0 })
        .collect();
    let rank = inverse.iter().filter(|&&s| s != 0.0).count();
    if rank == 0 {
        return Err(InductionError::Degenerate(
            "design matrix is all zeros".to_string(),
        ));
    }
    debug!(rank, rows, cols, sigma_max, "Design matrix decomposed");

    // W = V · S⁺ · Uᵗ · E
    let mut projected = u.transpose() * targets;
    for (k, &inv) in inverse.iter().enumerate() {
        for value in projected.row_mut(k).iter_mut() {
            *value *= inv;
        }
    }
    Ok(v_t.transpose() * projected)
}

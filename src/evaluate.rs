// Induction quality evaluation.
//
// Each window whose center token is in the vocabulary becomes one sample:
// the average embedding of the whole window (placeholder for unknown tokens)
// is mapped through the induction matrix and compared with the center
// token's true vector by cosine similarity.
//
// The summary reports the sample median and the root-mean-square deviation
// of the samples from that median (not from the mean).

use serde::Serialize;
use tracing::debug;

use crate::corpus::document::{Corpus, Document};
use crate::embeddings::table::EmbeddingTable;
use crate::error::{InductionError, Result};
use crate::induction::{context_average, InductionMatrix};

/// Median of the cosine samples and RMS deviation around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub median: f64,
    pub deviation: f64,
    pub samples: usize,
}

impl SummaryStatistics {
    pub fn from_samples(samples: &[f64]) -> Result<Self> {
        if samples.is_empty() {
            return Err(InductionError::Degenerate(
                "no window has an in-vocabulary center token to evaluate".to_string(),
            ));
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let n = samples.len() as f64;
        let deviation = (samples.iter().map(|s| (s - median).powi(2)).sum::<f64>() / n).sqrt();

        Ok(Self {
            median,
            deviation,
            samples: samples.len(),
        })
    }
}

/// Cosine similarity in [-1, 1]. Zero when either vector has zero length or
/// the lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Collects cosine samples one document at a time.
pub struct Evaluator<'a> {
    table: &'a EmbeddingTable,
    matrix: &'a InductionMatrix,
    window: usize,
    samples: Vec<f64>,
    skipped: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(table: &'a EmbeddingTable, matrix: &'a InductionMatrix, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(InductionError::InvalidWindow(window));
        }
        for got in [matrix.nrows(), matrix.ncols()] {
            if got != table.dimension() {
                return Err(InductionError::DimensionMismatch {
                    expected: table.dimension(),
                    got,
                });
            }
        }
        Ok(Self {
            table,
            matrix,
            window,
            samples: Vec::new(),
            skipped: 0,
        })
    }

    pub fn add_document(&mut self, document: &Document) {
        for window in document.tokens().windows(self.window) {
            let center = &window[window.len() / 2];
            let Some(truth) = self.table.embed(center) else {
                self.skipped += 1;
                continue;
            };

            let predicted = self.matrix.project(&context_average(self.table, window));
            let truth: Vec<f64> = truth.iter().map(|&v| v as f64).collect();
            self.samples.push(cosine_similarity(&predicted, &truth));
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn finish(self) -> Result<SummaryStatistics> {
        debug!(
            samples = self.samples.len(),
            skipped = self.skipped,
            "Evaluation finished"
        );
        SummaryStatistics::from_samples(&self.samples)
    }
}

/// Score the induction matrix over every window of the corpus.
pub fn evaluate(
    corpus: &Corpus,
    table: &EmbeddingTable,
    matrix: &InductionMatrix,
    window: usize,
) -> Result<SummaryStatistics> {
    let mut evaluator = Evaluator::new(table, matrix, window)?;
    for document in corpus {
        evaluator.add_document(document);
    }
    evaluator.finish()
}

// Run summary output: colored terminal display and the optional JSON report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::evaluate::SummaryStatistics;

/// Everything worth keeping about one induction run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub corpus: PathBuf,
    pub embeddings: PathBuf,
    pub output: PathBuf,
    pub window: usize,
    pub vocabulary: usize,
    pub dimension: usize,
    pub documents: usize,
    pub tokens: usize,
    /// Vocabulary rows with nonzero context weight (the regression rows).
    pub selected: usize,
    pub summary: SummaryStatistics,
}

/// The final stdout line of a run.
pub fn summary_line(stats: &SummaryStatistics) -> String {
    format!("μ = {}; σ = {}", stats.median, stats.deviation)
}

/// Print the run details to the terminal.
pub fn display_report(report: &RunReport) {
    println!("\n{}", "=== Induction Summary ===".bold());
    println!(
        "  Vocabulary:  {} words x {} dimensions",
        report.vocabulary, report.dimension
    );
    println!(
        "  Corpus:      {} documents, {} tokens",
        report.documents, report.tokens
    );

    let coverage = if report.vocabulary > 0 {
        report.selected as f64 / report.vocabulary as f64 * 100.0
    } else {
        0.0
    };
    let selected = format!("{} rows ({coverage:.1}% of vocabulary)", report.selected);
    let selected = if coverage < 1.0 {
        selected.yellow()
    } else {
        selected.normal()
    };
    println!("  Regression:  {selected}");
    println!("  Window:      {}", report.window);
    println!("  Matrix:      {}", report.output.display());
    println!(
        "  Samples:     {}",
        report.summary.samples.to_string().dimmed()
    );
    println!();
}

/// Write the report as pretty-printed JSON.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report to {}", path.display()))
}

use std::env;

use anyhow::{Context, Result};

use crate::corpus::pipeline::PoolOptions;

/// Runtime settings loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Command-line
/// flags take precedence over anything set here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Tokenizer worker count (ALACARTE_WORKERS, default 4)
    pub workers: usize,
    /// Paragraphs queued ahead of the workers (ALACARTE_QUEUE_DEPTH, default 64)
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        let pool = PoolOptions::default();
        Self {
            workers: pool.workers,
            queue_depth: pool.queue_depth,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            workers: parse_count(
                "ALACARTE_WORKERS",
                env::var("ALACARTE_WORKERS").ok().as_deref(),
                defaults.workers,
            )?,
            queue_depth: parse_count(
                "ALACARTE_QUEUE_DEPTH",
                env::var("ALACARTE_QUEUE_DEPTH").ok().as_deref(),
                defaults.queue_depth,
            )?,
        })
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            workers: self.workers,
            queue_depth: self.queue_depth,
        }
    }
}

/// Parse a positive count, falling back to `default` when unset.
fn parse_count(name: &str, value: Option<&str>, default: usize) -> Result<usize> {
    let Some(value) = value else {
        return Ok(default);
    };
    let count: usize = value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a positive integer, got {value:?}"))?;
    if count == 0 {
        anyhow::bail!("{name} must be at least 1");
    }
    Ok(count)
}

// Corpus handling: paragraph segmentation, normalization, and the
// concurrent tokenizer pool.

pub mod document;
pub mod pipeline;
pub mod tokenize;

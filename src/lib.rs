// A La Carte: induce word embeddings from context co-occurrence.
//
// This is the library root. Each module corresponds to one stage of the
// induction pipeline, from raw corpus text to a scored induction matrix.

pub mod config;
pub mod cooccurrence;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod evaluate;
pub mod induction;
pub mod mask;
pub mod output;
pub mod persist;
pub mod solver;

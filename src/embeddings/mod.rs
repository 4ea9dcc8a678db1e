// Pretrained embedding tables: file readers and the in-memory lookup table.

pub mod reader;
pub mod table;

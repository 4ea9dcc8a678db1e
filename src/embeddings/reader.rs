// Word2vec-style embedding file readers.
//
// Both layouts start with a "<wordCount> <dimension>" header. The binary
// layout follows each whitespace-terminated token with `dimension` contiguous
// little-endian f32 values; the text layout follows it with `dimension`
// whitespace-separated decimals.
//
// Running out of input before a token starts ends the file early without
// error, so tables cut short by a partial export still load. Running out in
// the middle of a record is a format error.
//
// Header values are untrusted. Buffers grow with the bytes actually read,
// never with what the header promises.

use std::io::{BufRead, ErrorKind, Read};
use std::path::Path;

use tracing::debug;

use crate::error::{InductionError, Result};

/// Largest vector dimension a header may declare.
pub const MAX_DIMENSION: usize = 1 << 24;

/// Values reserved up front for one text record.
const MAX_PREALLOCATED_VALUES: usize = 4096;

/// Receives the header and then each record as a reader walks an embedding file.
pub trait EmbeddingVisitor {
    /// Called once with the header values, before any record.
    fn head(&mut self, word_count: usize, dimension: usize) -> Result<()>;

    /// Called for each record, in file order.
    fn embed(&mut self, token: &str, vector: Vec<f32>) -> Result<()>;
}

/// On-disk layout of an embedding file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Binary,
    Text,
}

impl Layout {
    /// `.bin` files are binary; everything else is read as text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("bin") => Layout::Binary,
            _ => Layout::Text,
        }
    }
}

/// Walk an embedding file, feeding the header and records to `visitor`.
///
/// Returns the number of records read, which is less than the header's word
/// count when the file ends early at a record boundary.
pub fn read_embeddings<R, V>(reader: &mut R, layout: Layout, visitor: &mut V) -> Result<usize>
where
    R: BufRead,
    V: EmbeddingVisitor + ?Sized,
{
    let word_count = parse_header_field(read_word(reader)?, "word count")?;
    let dimension = parse_header_field(read_word(reader)?, "dimension")?;
    if dimension > MAX_DIMENSION {
        return Err(InductionError::Format(format!(
            "embedding header dimension {dimension} exceeds the limit of {MAX_DIMENSION}"
        )));
    }
    visitor.head(word_count, dimension)?;

    let mut read = 0;
    while read < word_count {
        let Some(token) = read_word(reader)? else {
            debug!(
                expected = word_count,
                read, "Embedding file ended early, keeping the records read so far"
            );
            break;
        };

        let vector = match layout {
            Layout::Binary => read_binary_vector(reader, dimension, &token)?,
            Layout::Text => read_text_vector(reader, dimension, &token)?,
        };
        visitor.embed(&token, vector)?;
        read += 1;
    }

    Ok(read)
}

fn parse_header_field(word: Option<String>, field: &str) -> Result<usize> {
    let word = word
        .ok_or_else(|| InductionError::Format(format!("embedding header is missing the {field}")))?;
    word.parse::<usize>().map_err(|_| {
        InductionError::Format(format!(
            "embedding header {field} must be a non-negative integer, got {word:?}"
        ))
    })
}

fn read_binary_vector<R: BufRead>(reader: &mut R, dimension: usize, token: &str) -> Result<Vec<f32>> {
    let record_bytes = dimension
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or_else(|| InductionError::Format(format!("dimension {dimension} is too large")))?;

    let mut bytes = Vec::new();
    reader.by_ref().take(record_bytes as u64).read_to_end(&mut bytes)?;
    if bytes.len() < record_bytes {
        return Err(InductionError::Format(format!(
            "record for {token:?} ends before {dimension} values"
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn read_text_vector<R: BufRead>(reader: &mut R, dimension: usize, token: &str) -> Result<Vec<f32>> {
    let mut vector = Vec::with_capacity(dimension.min(MAX_PREALLOCATED_VALUES));
    for _ in 0..dimension {
        let word = read_word(reader)?.ok_or_else(|| {
            InductionError::Format(format!("record for {token:?} ends before {dimension} values"))
        })?;
        let value = word.parse::<f32>().map_err(|_| {
            InductionError::Format(format!("record for {token:?} has a non-numeric value {word:?}"))
        })?;
        vector.push(value);
    }
    Ok(vector)
}

/// Read one whitespace-delimited word, skipping leading whitespace.
///
/// Exactly one trailing whitespace byte is consumed, so binary float data that
/// follows a token is left untouched. Returns `None` at end of input.
fn read_word<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut word = Vec::new();
    loop {
        let buf = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if buf.is_empty() {
            break;
        }

        let mut consumed = 0;
        let mut finished = false;
        for &byte in buf {
            consumed += 1;
            if byte.is_ascii_whitespace() {
                if word.is_empty() {
                    continue;
                }
                finished = true;
                break;
            }
            word.push(byte);
        }
        reader.consume(consumed);
        if finished {
            break;
        }
    }

    if word.is_empty() {
        return Ok(None);
    }
    String::from_utf8(word)
        .map(Some)
        .map_err(|e| InductionError::Format(format!("token is not valid UTF-8: {e}")))
}

// Induction matrix file format.
//
// A text header "<rows> <cols>\n" followed by rows×cols little-endian f64
// values in row-major order. Reads must find exactly the number of values the
// header promises; a short body is an I/O error. The body buffer grows with
// the bytes read, so a lying header cannot force a large allocation.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use nalgebra::DMatrix;
use tracing::info;

use crate::error::{InductionError, Result};
use crate::induction::InductionMatrix;

/// Write `matrix` in the induction matrix format.
pub fn write<W: Write>(writer: &mut W, matrix: &DMatrix<f64>) -> Result<()> {
    let (rows, cols) = matrix.shape();
    writeln!(writer, "{rows} {cols}")?;

    let mut body = Vec::with_capacity(rows * cols * 8);
    for i in 0..rows {
        for j in 0..cols {
            body.extend_from_slice(&matrix[(i, j)].to_le_bytes());
        }
    }
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Read a matrix written by [`write`].
pub fn read<R: BufRead>(reader: &mut R) -> Result<DMatrix<f64>> {
    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 {
        return Err(InductionError::Format(
            "matrix file is empty, expected a \"<rows> <cols>\" header".to_string(),
        ));
    }

    let fields: Vec<&str> = header.split_whitespace().collect();
    let [rows, cols] = fields.as_slice() else {
        return Err(InductionError::Format(format!(
            "matrix header must be \"<rows> <cols>\", got {:?}",
            header.trim_end()
        )));
    };
    let rows = parse_extent(rows, "rows")?;
    let cols = parse_extent(cols, "cols")?;

    let len = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(8))
        .ok_or_else(|| InductionError::Format(format!("matrix of {rows}x{cols} is too large")))?;
    let mut body = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut body)?;
    if body.len() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "matrix body holds {} of {len} bytes for a {rows}x{cols} matrix",
                body.len()
            ),
        )
        .into());
    }

    let values: Vec<f64> = body
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();
    Ok(DMatrix::from_row_slice(rows, cols, &values))
}

fn parse_extent(field: &str, name: &str) -> Result<usize> {
    field.parse::<usize>().map_err(|_| {
        InductionError::Format(format!("matrix header {name} must be a non-negative integer, got {field:?}"))
    })
}

/// Write the induction matrix to `path`, replacing any existing file.
pub fn save(path: &Path, matrix: &InductionMatrix) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer, matrix.matrix())?;
    info!(
        path = %path.display(),
        rows = matrix.nrows(),
        cols = matrix.ncols(),
        "Saved induction matrix"
    );
    Ok(())
}

/// Read an induction matrix from `path`.
pub fn load(path: &Path) -> Result<InductionMatrix> {
    let mut reader = BufReader::new(File::open(path)?);
    read(&mut reader).map(InductionMatrix::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};

    fn encode(matrix: &DMatrix<f64>) -> Vec<u8> {
        let mut buf = Vec::new();
        write(&mut buf, matrix).unwrap();
        buf
    }

    #[test]
    fn test_layout_is_header_then_row_major() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let bytes = encode(&m);

        assert!(bytes.starts_with(b"2 2\n"));
        assert_eq!(bytes.len(), 4 + 4 * 8);
        // Second value on disk is row 0, column 1.
        assert_eq!(&bytes[12..20], &2.0_f64.to_le_bytes());
    }

    #[test]
    fn test_round_trip_keeps_last_row_and_column() {
        let m = DMatrix::from_fn(3, 4, |i, j| (i * 10 + j) as f64 + 0.25);
        let back = read(&mut Cursor::new(encode(&m))).unwrap();
        assert_eq!(back, m);
        assert_eq!(back[(2, 3)], 23.25);
    }

    #[test]
    fn test_short_body_is_io_error() {
        let m = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let mut bytes = encode(&m);
        bytes.pop();
        match read(&mut Cursor::new(bytes)) {
            Err(InductionError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn test_large_header_over_tiny_body_is_io_error() {
        let bytes = b"2000000 2000000\n\x00\x00".to_vec();
        match read(&mut Cursor::new(bytes)) {
            Err(InductionError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_headers() {
        for header in ["", "2\n", "2 x\n", "1 2 3\n", "-1 2\n"] {
            let err = read(&mut Cursor::new(header.as_bytes().to_vec())).unwrap_err();
            assert!(matches!(err, InductionError::Format(_)), "{header:?} gave {err:?}");
        }
    }
}

//! Plain-text matrix files and random inputs.
//!
//! The encoding is a header line `rows cols` followed by `rows` lines of
//! `cols` whitespace-separated integers. Only square matrices are accepted.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rand::Rng;

use crate::{Error, Matrix};

/// Exclusive upper bound of generated values.
pub const VALUE_BOUND: i64 = 100;

pub fn load<R: BufRead>(reader: R) -> Result<Matrix, Error> {
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()));

    let (header_line, header) = match lines.next() {
        Some((number, line)) => (number, text(number, line)?),
        None => return Err(format_error(1, "missing `rows cols` header")),
    };
    let n = parse_header(header_line, &header)?;

    // Storage grows with the rows actually present, not with the header.
    let mut data = Vec::new();
    for expected_row in 0..n {
        let (number, line) = match lines.next() {
            Some((number, line)) => (number, text(number, line)?),
            None => {
                return Err(format_error(
                    header_line + expected_row + 1,
                    format!("expected {} rows, found {}", n, expected_row),
                ));
            }
        };

        let before = data.len();
        for token in line.split_whitespace() {
            let value = token
                .parse::<i64>()
                .map_err(|_| format_error(number, format!("`{}` is not an integer", token)))?;
            data.push(value);
        }

        let found = data.len() - before;
        if found != n {
            return Err(format_error(
                number,
                format!("expected {} values, found {}", n, found),
            ));
        }
    }

    if let Some((number, _)) = lines.next() {
        return Err(format_error(
            number,
            format!("data after the last of {} rows", n),
        ));
    }

    Matrix::from_flat(n, data)
}

pub fn save<W: Write>(matrix: &Matrix, mut writer: W) -> Result<(), Error> {
    writeln!(writer, "{} {}", matrix.dim(), matrix.dim())?;
    for row in matrix.rows() {
        let mut values = row.iter();
        if let Some(first) = values.next() {
            write!(writer, "{}", first)?;
        }
        for value in values {
            write!(writer, " {}", value)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_file(path: &Path) -> Result<Matrix, Error> {
    load(BufReader::new(File::open(path)?))
}

pub fn save_file(matrix: &Matrix, path: &Path) -> Result<(), Error> {
    save(matrix, BufWriter::new(File::create(path)?))
}

/// Fills an N×N matrix with values in `[0, VALUE_BOUND)`.
pub fn generate<R: Rng>(n: usize, rng: &mut R) -> Matrix {
    let mut matrix = Matrix::zeros(n);
    for value in matrix.as_mut_slice() {
        *value = rng.gen_range(0..VALUE_BOUND);
    }
    matrix
}

fn parse_header(line: usize, header: &str) -> Result<usize, Error> {
    let dims = header
        .split_whitespace()
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| format_error(line, format!("`{}` is not a dimension", token)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match dims.as_slice() {
        [rows, cols] if rows != cols => Err(format_error(
            line,
            format!("only square matrices are supported, got {}x{}", rows, cols),
        )),
        [0, _] => Err(format_error(line, "dimension must be positive")),
        [n, _] if Matrix::cell_count(*n).is_none() => {
            Err(format_error(line, format!("{}x{} is too large to hold", n, n)))
        }
        [n, _] => Ok(*n),
        _ => Err(format_error(line, "header must be `rows cols`")),
    }
}

fn text(number: usize, line: io::Result<String>) -> Result<String, Error> {
    line.map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => format_error(number, "line is not valid UTF-8"),
        _ => Error::Io(e),
    })
}

fn format_error(line: usize, reason: impl Into<String>) -> Error {
    Error::Format {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn load_str(text: &str) -> Result<Matrix, Error> {
        load(text.as_bytes())
    }

    #[test]
    fn round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in [1, 2, 5, 17] {
            let m = generate(n, &mut rng);
            let mut buf = Vec::new();
            save(&m, &mut buf).unwrap();
            assert_eq!(load(buf.as_slice()).unwrap(), m);
        }
    }

    #[test]
    fn round_trip_keeps_negatives_and_extremes() {
        let m = Matrix::from_rows(vec![vec![i64::MIN, -1], vec![0, i64::MAX]]).unwrap();
        let mut buf = Vec::new();
        save(&m, &mut buf).unwrap();
        assert_eq!(load(buf.as_slice()).unwrap(), m);
    }

    #[test]
    fn writes_header_and_rows() {
        let m = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let mut buf = Vec::new();
        save(&m, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "2 2\n1 2\n3 4\n");
    }

    #[test]
    fn accepts_trailing_spaces_and_blank_lines() {
        let m = load_str("2 2\n1 2 \n\n3 4 \n\n").unwrap();
        assert_eq!(m.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_non_square() {
        let err = load_str("2 3\n1 2 3\n4 5 6\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn rejects_short_row() {
        let err = load_str("2 2\n1 2\n3\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 3, .. }));
    }

    #[test]
    fn rejects_missing_rows() {
        let err = load_str("3 3\n1 2 3\n").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn rejects_non_numeric_token() {
        let err = load_str("1 1\nx\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn rejects_extra_rows() {
        let err = load_str("1 1\n5\n6\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 3, .. }));
    }

    #[test]
    fn rejects_empty_input_and_zero_dimension() {
        assert!(matches!(load_str(""), Err(Error::Format { line: 1, .. })));
        assert!(matches!(load_str("0 0\n"), Err(Error::Format { .. })));
    }

    #[test]
    fn rejects_oversized_header() {
        let err = load_str("5000000000 5000000000\n1\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn huge_header_fails_on_missing_rows() {
        let err = load_str("100000 100000\n1 2\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn invalid_utf8_is_format_error() {
        let err = load(&b"1 1\n\xff\n"[..]).unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn generated_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = generate(20, &mut rng);
        assert!(m.as_slice().iter().all(|v| (0..VALUE_BOUND).contains(v)));
    }
}

//! Row-restricted, full and threaded products.
//!
//! All variants share one kernel: i-k-j loop order with `k` ascending, so the
//! inner loop walks rows of B and C sequentially and every cell accumulates
//! its terms in the same order no matter how rows are split up. Arithmetic
//! wraps on `i64` overflow.

use std::thread;

use tracing::debug;

use crate::partition::{RowRange, partition};
use crate::{Error, Matrix};

/// Partial product of `a × b` restricted to the rows in `range`.
///
/// Rows outside `range` stay zero. An empty range returns the zero matrix.
pub fn multiply_range(a: &Matrix, b: &Matrix, range: RowRange) -> Result<Matrix, Error> {
    let n = check_operands(a, b)?;
    if range.start > range.end || range.end > n {
        return Err(Error::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            n,
        });
    }

    let mut partial = Matrix::zeros(n);
    if !range.is_empty() {
        let rows = &mut partial.as_mut_slice()[range.start * n..range.end * n];
        multiply_rows(a, b, range, rows);
    }
    Ok(partial)
}

/// The single-threaded product.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix, Error> {
    multiply_range(a, b, RowRange::new(0, a.dim()))
}

/// Shared-memory product: `threads` scoped threads each fill a disjoint
/// block of rows of one result buffer.
pub fn multiply_threaded(a: &Matrix, b: &Matrix, threads: usize) -> Result<Matrix, Error> {
    let n = check_operands(a, b)?;
    if threads == 0 {
        return Err(Error::Config("thread count must be positive".to_string()));
    }

    let mut result = Matrix::zeros(n);
    thread::scope(|scope| {
        let mut rest = result.as_mut_slice();
        for range in partition(n, threads) {
            let (block, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * n);
            rest = tail;
            if !range.is_empty() {
                debug!(start = range.start, end = range.end, "spawning row block");
                scope.spawn(move || multiply_rows(a, b, range, block));
            }
        }
    });
    Ok(result)
}

/// Accumulates rows `range` of `a × b` into `out`, whose first row is
/// `range.start`.
fn multiply_rows(a: &Matrix, b: &Matrix, range: RowRange, out: &mut [i64]) {
    let n = a.dim();
    for (out_row, i) in out.chunks_exact_mut(n).zip(range.iter()) {
        let a_row = a.row(i);
        for (k, &a_ik) in a_row.iter().enumerate() {
            for (c, &b_kj) in out_row.iter_mut().zip(b.row(k)) {
                *c = c.wrapping_add(a_ik.wrapping_mul(b_kj));
            }
        }
    }
}

fn check_operands(a: &Matrix, b: &Matrix) -> Result<usize, Error> {
    if a.dim() != b.dim() {
        return Err(Error::DimensionMismatch(a.dim(), b.dim()));
    }
    Ok(a.dim())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::store::generate;

    fn sample() -> (Matrix, Matrix) {
        (
            Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap(),
            Matrix::from_rows(vec![vec![5, 6], vec![7, 8]]).unwrap(),
        )
    }

    /// Textbook i-j-k product used as the reference.
    fn reference(a: &Matrix, b: &Matrix) -> Matrix {
        let n = a.dim();
        let mut c = Matrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0i64;
                for k in 0..n {
                    sum = sum.wrapping_add(a.get(i, k).wrapping_mul(b.get(k, j)));
                }
                c.row_mut(i)[j] = sum;
            }
        }
        c
    }

    #[test]
    fn two_by_two_product() {
        let (a, b) = sample();
        let c = multiply(&a, &b).unwrap();
        assert_eq!(c.to_rows(), vec![vec![19, 22], vec![43, 50]]);
    }

    #[test]
    fn partial_rows_stay_zero_outside_range() {
        let (a, b) = sample();
        let top = multiply_range(&a, &b, RowRange::new(0, 1)).unwrap();
        let bottom = multiply_range(&a, &b, RowRange::new(1, 2)).unwrap();
        assert_eq!(top.to_rows(), vec![vec![19, 22], vec![0, 0]]);
        assert_eq!(bottom.to_rows(), vec![vec![0, 0], vec![43, 50]]);
    }

    #[test]
    fn empty_range_is_noop() {
        let (a, b) = sample();
        let partial = multiply_range(&a, &b, RowRange::new(1, 1)).unwrap();
        assert_eq!(partial, Matrix::zeros(2));
    }

    #[test]
    fn single_cell() {
        let a = Matrix::from_rows(vec![vec![-3]]).unwrap();
        let b = Matrix::from_rows(vec![vec![7]]).unwrap();
        assert_eq!(multiply(&a, &b).unwrap().as_slice(), &[-21]);
    }

    #[test]
    fn rejects_mismatched_operands() {
        let a = Matrix::zeros(2);
        let b = Matrix::zeros(3);
        assert!(matches!(
            multiply(&a, &b),
            Err(Error::DimensionMismatch(2, 3))
        ));
    }

    #[test]
    fn rejects_range_past_matrix() {
        let (a, b) = sample();
        assert!(matches!(
            multiply_range(&a, &b, RowRange::new(1, 3)),
            Err(Error::RangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn matches_reference_product() {
        let mut rng = StdRng::seed_from_u64(11);
        for n in [1, 3, 8, 13] {
            let a = generate(n, &mut rng);
            let b = generate(n, &mut rng);
            assert_eq!(multiply(&a, &b).unwrap(), reference(&a, &b), "n = {}", n);
        }
    }

    #[test]
    fn overflow_wraps() {
        let a = Matrix::from_rows(vec![vec![i64::MAX]]).unwrap();
        let b = Matrix::from_rows(vec![vec![2]]).unwrap();
        assert_eq!(multiply(&a, &b).unwrap().as_slice(), &[-2]);
    }

    #[test]
    fn threaded_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = generate(23, &mut rng);
        let b = generate(23, &mut rng);
        let expected = multiply(&a, &b).unwrap();
        for threads in [1, 2, 5, 10, 15, 40] {
            assert_eq!(
                multiply_threaded(&a, &b, threads).unwrap(),
                expected,
                "{} threads",
                threads
            );
        }
    }

    #[test]
    fn threaded_rejects_zero_threads() {
        let (a, b) = sample();
        assert!(matches!(
            multiply_threaded(&a, &b, 0),
            Err(Error::Config(_))
        ));
    }
}

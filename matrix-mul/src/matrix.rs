//! Square, dense, row-major integer matrices.

use crate::Error;

/// An N×N matrix of `i64`, stored row-major in one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    n: usize,
    data: Vec<i64>,
}

impl Matrix {
    /// Number of cells of an N×N matrix, or `None` when its storage could
    /// not be addressed.
    pub fn cell_count(n: usize) -> Option<usize> {
        let cells = n.checked_mul(n)?;
        let bytes = cells.checked_mul(size_of::<i64>())?;
        (bytes <= isize::MAX as usize).then_some(cells)
    }

    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0; n * n],
        }
    }

    /// Wraps a row-major buffer of `n * n` values.
    pub fn from_flat(n: usize, data: Vec<i64>) -> Result<Self, Error> {
        if Matrix::cell_count(n) != Some(data.len()) {
            return Err(Error::Protocol(format!(
                "{} values cannot form a {}x{} matrix",
                data.len(),
                n,
                n
            )));
        }
        Ok(Self { n, data })
    }

    /// Builds a matrix from rows, which must all be `rows.len()` long.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, Error> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(Error::Protocol(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            data.extend(row);
        }
        Ok(Self { n, data })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.n + col]
    }

    pub fn row(&self, i: usize) -> &[i64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [i64] {
        &mut self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i64]> {
        // chunks_exact(0) panics, and a 0x0 matrix has no rows anyway.
        self.data.chunks_exact(self.n.max(1))
    }

    /// Copies every row into its own buffer, ready to be sent.
    pub fn to_rows(&self) -> Vec<Vec<i64>> {
        self.rows().map(<[i64]>::to_vec).collect()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [i64] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_row_major() {
        let m = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(m.dim(), 2);
        assert_eq!(m.get(1, 0), 3);
        assert_eq!(m.row(0), &[1, 2]);
        assert_eq!(m.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(m.to_rows(), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Matrix::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(Matrix::from_flat(3, vec![0; 8]).is_err());
        assert_eq!(Matrix::from_flat(2, vec![0; 4]).unwrap(), Matrix::zeros(2));
    }

    #[test]
    fn cell_count_refuses_unaddressable_sizes() {
        assert_eq!(Matrix::cell_count(3), Some(9));
        assert_eq!(Matrix::cell_count(0), Some(0));
        assert_eq!(Matrix::cell_count(usize::MAX), None);
        assert_eq!(Matrix::cell_count(1usize << (usize::BITS / 2)), None);
        assert!(Matrix::from_flat(usize::MAX, Vec::new()).is_err());
    }

    #[test]
    fn empty_matrix_has_no_rows() {
        assert_eq!(Matrix::zeros(0).rows().count(), 0);
    }
}

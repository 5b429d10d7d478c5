//! Row decomposition of an N×N product across workers.

use std::ops::Range;

/// Half-open interval `[start, end)` of row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, row: usize) -> bool {
        (self.start..self.end).contains(&row)
    }

    pub fn iter(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Rows owned by `rank` out of `total_workers`.
///
/// Every rank but the last gets `n / total_workers` rows; the last rank also
/// takes the remainder, so it can end up with noticeably more work than the
/// others (up to `total_workers - 1` extra rows). When `n < total_workers`
/// every rank but the last gets an empty range.
pub fn assign_rows(n: usize, total_workers: usize, rank: usize) -> RowRange {
    debug_assert!(total_workers > 0 && rank < total_workers);

    let step = n / total_workers;
    let start = rank * step;
    let end = if rank == total_workers - 1 {
        n
    } else {
        start + step
    };
    RowRange::new(start, end)
}

/// Every rank's range, in rank order.
pub fn partition(n: usize, total_workers: usize) -> Vec<RowRange> {
    (0..total_workers)
        .map(|rank| assign_rows(n, total_workers, rank))
        .collect()
}

//! Error types for matrix-mul operations.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("communication error: {0}")]
    Comm(#[from] matmul_comm::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed matrix data at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("matrix dimension mismatch: A is {0}x{0}, B is {1}x{1}")]
    DimensionMismatch(usize, usize),

    #[error("row range {start}..{end} exceeds a {n}x{n} matrix")]
    RangeOutOfBounds { start: usize, end: usize, n: usize },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("result in {path} differs from the recomputed product at [{row}][{col}]")]
    VerificationFailed { path: PathBuf, row: usize, col: usize },
}

//! Dense integer matrix multiplication, three ways.
//!
//! `matrix-mul` multiplies square `i64` matrices single-threaded, with
//! threads sharing one result buffer, or across workers that share nothing
//! and cooperate only through a [`matmul_comm::Communicator`].
//!
//! # Distributed Round
//!
//! Every worker runs the same steps for each problem size:
//!
//! 1. **Distribute**: the coordinator (rank 0) sends the dimension, then
//!    every row of A and of B, to every other worker
//! 2. **Partition**: each worker takes its contiguous block of rows
//!    (`n / W` rows, the last worker also takes the remainder)
//! 3. **Multiply**: each worker computes its rows into a zeroed N×N buffer
//! 4. **Reduce**: the buffers are summed element-wise onto the coordinator
//!
//! # Example
//!
//! ```no_run
//! use matmul_comm::{Communicator, LocalCommunicator};
//! use matrix_mul::{Matrix, Worker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), matrix_mul::Error> {
//!     let a = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]])?;
//!     let b = Matrix::from_rows(vec![vec![5, 6], vec![7, 8]])?;
//!
//!     let mut handles = Vec::new();
//!     for comm in LocalCommunicator::world(2)? {
//!         let inputs = comm.identity().is_coordinator().then(|| (a.clone(), b.clone()));
//!         handles.push(tokio::spawn(async move {
//!             Worker::new(&comm).run_round(inputs).await
//!         }));
//!     }
//!
//!     for handle in handles {
//!         if let Some(outcome) = handle.await?? {
//!             assert_eq!(outcome.result.to_rows(), vec![vec![19, 22], vec![43, 50]]);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod distribute;
mod error;
mod matrix;
pub mod multiply;
pub mod partition;
pub mod reduce;
pub mod report;
pub mod store;
pub mod sweep;
mod worker;

pub use error::Error;
pub use matmul_comm::WorkerIdentity;
pub use matrix::Matrix;
pub use partition::{RowRange, assign_rows};
pub use worker::{RoundOutcome, Worker};

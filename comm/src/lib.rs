//! Message passing between matrix-mul workers.
//!
//! `matmul-comm` gives a fixed set of workers, each identified by a
//! [`WorkerIdentity`], a small MPI-like vocabulary: tagged point-to-point
//! sends and receives plus a sum-reduction collective. Workers never share
//! memory; everything they exchange goes through a [`Communicator`].
//!
//! Two transports are provided:
//!
//! - [`LocalCommunicator`] connects workers living in one process (tasks or
//!   threads) through shared inboxes.
//! - [`GrpcCommunicator`] connects worker processes. Each worker serves a
//!   `Mailbox` gRPC service on its own address and streams outgoing messages
//!   to the mailboxes of its peers.
//!
//! # Example
//!
//! ```no_run
//! use matmul_comm::{Communicator, LocalCommunicator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), matmul_comm::Error> {
//!     let mut world = LocalCommunicator::world(2)?;
//!     let worker = world.pop().unwrap();
//!     let coordinator = world.pop().unwrap();
//!
//!     coordinator.send(1, 7, vec![1, 2, 3]).await?;
//!     assert_eq!(worker.recv(0, 7).await?, vec![1, 2, 3]);
//!     Ok(())
//! }
//! ```

mod communicator;
mod error;
mod grpc;
mod identity;
mod inbox;
mod local;

pub use communicator::{Communicator, Tag};
pub use error::Error;
pub use grpc::{GrpcCommunicator, GrpcOptions, ServerAddr};
pub use identity::{COORDINATOR_RANK, WorkerIdentity};
pub use inbox::Inbox;
pub use local::LocalCommunicator;

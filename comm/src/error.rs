//! Error types for worker communication.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid worker world: rank {rank} of {total_workers} workers")]
    InvalidWorld { rank: usize, total_workers: usize },

    #[error("rank {rank} is outside a world of {total_workers} workers")]
    InvalidRank { rank: usize, total_workers: usize },

    #[error("peer table lists {found} addresses for {expected} workers")]
    PeerCount { expected: usize, found: usize },

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("gRPC status error: {0}")]
    Status(#[from] tonic::Status),

    #[error("failed to bind mailbox on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rank {rank} at {addr} unreachable after {waited:?}")]
    Unreachable {
        rank: usize,
        addr: String,
        waited: Duration,
    },

    #[error("timed out after {waited:?} waiting for tag {tag} from rank {from}")]
    Timeout {
        from: usize,
        tag: u32,
        waited: Duration,
    },

    #[error("mailbox server stopped, no more messages can arrive")]
    ConnectionClosed,

    #[error("protocol violation: {0}")]
    Protocol(String),
}

//! Wire types for the worker mailbox.
//!
//! Every worker runs a `Mailbox` gRPC service. Peers push [`Envelope`]s to it
//! over a client stream and receive a single [`Ack`] once the whole stream
//! has been buffered on the receiving side.
//!
//! The service definition is generated at build time; the messages are plain
//! prost structs so no `protoc` is needed.

/// One tagged message from one worker to another.
///
/// `values` carries a single matrix row, a dimension, or any other flat run
/// of integers the sender wants to hand over.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Envelope {
    #[prost(uint32, tag = "1")]
    pub source: u32,
    #[prost(uint32, tag = "2")]
    pub tag: u32,
    #[prost(sint64, repeated, tag = "3")]
    pub values: Vec<i64>,
}

/// Reply to a `Deliver` stream.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Ack {
    /// Number of envelopes the receiver buffered.
    #[prost(uint64, tag = "1")]
    pub received: u64,
}

include!(concat!(env!("OUT_DIR"), "/matmul.Mailbox.rs"));

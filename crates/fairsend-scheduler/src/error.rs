//! Scheduler error types.

use fairsend_core::{ClientId, FileId, NodeId};
use thiserror::Error;

/// Errors returned by world commands. The tick itself never fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("client must be created with at least one file")]
    EmptyFileSet,

    #[error("file weight must be positive")]
    InvalidWeight,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// A broken bookkeeping invariant, reported by `World::check_invariants`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("file {file_id} has sent {sent} > weight {weight}")]
    SentExceedsWeight { file_id: FileId, sent: u64, weight: u64 },

    #[error("client {client_id}: non-head file {file_id} has progress")]
    NonHeadProgress { client_id: ClientId, file_id: FileId },

    #[error("client {0} is live with an empty file queue")]
    EmptyQueue(ClientId),

    #[error("client {client_id} is sending but node {node_id:?} does not serve it")]
    UnboundClient {
        client_id: ClientId,
        node_id: Option<NodeId>,
    },

    #[error("node {node_id} is processing for {bound} clients, expected 1")]
    NodeBindingMismatch { node_id: NodeId, bound: usize },

    #[error("node {0} is idle but still referenced by a sending client")]
    IdleNodeReferenced(NodeId),
}

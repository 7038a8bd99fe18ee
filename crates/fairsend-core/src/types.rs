//! Shared types used across fairsend crates.
//!
//! These are the entities the scheduler mutates on every tick: files
//! queued by clients, the clients themselves, and the fixed pool of
//! nodes that serve one file at a time.

use serde::{Deserialize, Serialize};

/// Unique identifier for a file. Allocated monotonically, never reused.
pub type FileId = u64;

/// Identifier for a client within the live client set.
pub type ClientId = u64;

/// Identifier for a node in the fixed pool.
pub type NodeId = u32;

/// Logical simulation time, one unit per tick.
pub type Tick = u64;

// ── File ───────────────────────────────────────────────────────────

/// A file queued for transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct File {
    pub file_id: FileId,
    /// Total units required to send the file.
    pub weight: u64,
    /// Units transferred so far. Never exceeds `weight`.
    pub sent: u64,
}

impl File {
    pub fn new(file_id: FileId, weight: u64) -> Self {
        Self {
            file_id,
            weight,
            sent: 0,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.weight.saturating_sub(self.sent)
    }

    pub fn is_complete(&self) -> bool {
        self.sent >= self.weight
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Client lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    Waiting,
    SendingFile,
}

impl ClientStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ClientStatus::Waiting => "WAITING",
            ClientStatus::SendingFile => "SENDING_FILE",
        }
    }
}

/// A client holding a queue of files to send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub client_id: ClientId,
    /// Sorted ascending by weight. The head is the next file served.
    pub files: Vec<File>,
    pub status: ClientStatus,
    /// When the client entered its current waiting period.
    pub waiting_from: Tick,
    /// Node serving this client. Meaningful only while `SendingFile`.
    pub node_id: Option<NodeId>,
}

impl Client {
    /// Create a waiting client. `files` is sorted by weight.
    pub fn new(client_id: ClientId, files: Vec<File>, now: Tick) -> Self {
        let mut client = Self {
            client_id,
            files: Vec::with_capacity(files.len()),
            status: ClientStatus::Waiting,
            waiting_from: now,
            node_id: None,
        };
        for file in files {
            client.insert_file(file);
        }
        client
    }

    pub fn head(&self) -> Option<&File> {
        self.files.first()
    }

    pub fn head_mut(&mut self) -> Option<&mut File> {
        self.files.first_mut()
    }

    /// Insert a file keeping the queue sorted ascending by weight.
    ///
    /// Equal weights keep insertion order.
    pub fn insert_file(&mut self, file: File) {
        let idx = self.files.partition_point(|f| f.weight <= file.weight);
        self.files.insert(idx, file);
    }

    pub fn is_waiting(&self) -> bool {
        self.status == ClientStatus::Waiting
    }

    /// Units still to send across the whole queue.
    pub fn pending_weight(&self) -> u64 {
        self.files.iter().map(File::remaining).sum()
    }
}

// ── Node ───────────────────────────────────────────────────────────

/// Node status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Waiting,
    ProcessingFile,
}

impl NodeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::Waiting => "WAITING",
            NodeStatus::ProcessingFile => "PROCESSING_FILE",
        }
    }
}

/// A transfer node. Serves one file at a time.
///
/// `client_id` and `file_id` describe the current transfer while
/// `ProcessingFile`; after release they keep the last values until the
/// node is reassigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub node_id: NodeId,
    pub status: NodeStatus,
    pub client_id: Option<ClientId>,
    pub file_id: Option<FileId>,
}

impl Node {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            status: NodeStatus::Waiting,
            client_id: None,
            file_id: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == NodeStatus::Waiting
    }

    /// Bind this node to a client's head file.
    pub fn bind(&mut self, client_id: ClientId, file_id: FileId) {
        self.client_id = Some(client_id);
        self.file_id = Some(file_id);
        self.status = NodeStatus::ProcessingFile;
    }

    /// Return the node to the idle pool. Binding fields are left as-is.
    pub fn release(&mut self) {
        self.status = NodeStatus::Waiting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_sorts_files_by_weight() {
        let files = vec![File::new(0, 500), File::new(1, 20), File::new(2, 300)];
        let client = Client::new(7, files, 0);

        let weights: Vec<u64> = client.files.iter().map(|f| f.weight).collect();
        assert_eq!(weights, vec![20, 300, 500]);
        assert_eq!(client.head().unwrap().file_id, 1);
        assert_eq!(client.status, ClientStatus::Waiting);
    }

    #[test]
    fn insert_file_keeps_order_for_equal_weights() {
        let mut client = Client::new(1, vec![File::new(0, 10)], 0);
        client.insert_file(File::new(1, 10));
        client.insert_file(File::new(2, 5));

        let ids: Vec<FileId> = client.files.iter().map(|f| f.file_id).collect();
        assert_eq!(ids, vec![2, 0, 1]);
    }

    #[test]
    fn file_completion() {
        let mut file = File::new(0, 3);
        assert!(!file.is_complete());
        assert_eq!(file.remaining(), 3);

        file.sent = 3;
        assert!(file.is_complete());
        assert_eq!(file.remaining(), 0);
    }

    #[test]
    fn pending_weight_sums_remaining() {
        let mut client = Client::new(1, vec![File::new(0, 4), File::new(1, 6)], 0);
        client.head_mut().unwrap().sent = 3;
        assert_eq!(client.pending_weight(), 7);
    }

    #[test]
    fn node_release_keeps_stale_binding() {
        let mut node = Node::new(1);
        node.bind(4, 9);
        assert_eq!(node.status, NodeStatus::ProcessingFile);

        node.release();
        assert!(node.is_idle());
        assert_eq!(node.client_id, Some(4));
        assert_eq!(node.file_id, Some(9));
    }

    #[test]
    fn statuses_serialize_as_labels() {
        let json = serde_json::to_string(&NodeStatus::ProcessingFile).unwrap();
        assert_eq!(json, "\"PROCESSING_FILE\"");
        let json = serde_json::to_string(&ClientStatus::SendingFile).unwrap();
        assert_eq!(json, "\"SENDING_FILE\"");
        assert_eq!(ClientStatus::Waiting.label(), "WAITING");
    }
}

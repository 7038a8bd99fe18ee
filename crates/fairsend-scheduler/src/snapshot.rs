//! Read model for display: node list plus flattened files with owners.

use std::fmt::Write as _;

use serde::Serialize;

use fairsend_core::{ClientId, ClientStatus, FileId, Node, NodeId, NodeStatus, Tick};

use crate::scheduler::World;

/// A queued file together with the client that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    pub client_id: ClientId,
    pub file_id: FileId,
    pub weight: u64,
    pub sent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientView {
    pub client_id: ClientId,
    pub status: ClientStatus,
    pub waiting_from: Tick,
    pub node_id: Option<NodeId>,
    pub files: usize,
    pub pending_weight: u64,
}

/// Point-in-time copy of the world, taken between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldSnapshot {
    pub now: Tick,
    pub nodes: Vec<Node>,
    pub files: Vec<FileView>,
    pub clients: Vec<ClientView>,
}

impl World {
    pub fn snapshot(&self) -> WorldSnapshot {
        let files = self
            .clients()
            .iter()
            .flat_map(|c| {
                c.files.iter().map(move |f| FileView {
                    client_id: c.client_id,
                    file_id: f.file_id,
                    weight: f.weight,
                    sent: f.sent,
                })
            })
            .collect();

        let clients = self
            .clients()
            .iter()
            .map(|c| ClientView {
                client_id: c.client_id,
                status: c.status,
                waiting_from: c.waiting_from,
                node_id: c.node_id.filter(|_| c.status == ClientStatus::SendingFile),
                files: c.files.len(),
                pending_weight: c.pending_weight(),
            })
            .collect();

        WorldSnapshot {
            now: self.now(),
            nodes: self.nodes().to_vec(),
            files,
            clients,
        }
    }
}

impl WorldSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text tables for terminal output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "tick {}", self.now);

        let _ = writeln!(out, "\nNODES");
        let _ = writeln!(out, "  {:<6} {:<16} {:<8} {:<8}", "node", "status", "client", "file");
        for node in &self.nodes {
            let (client, file) = match node.status {
                NodeStatus::ProcessingFile => (
                    opt_to_string(node.client_id),
                    opt_to_string(node.file_id),
                ),
                NodeStatus::Waiting => ("-".to_string(), "-".to_string()),
            };
            let _ = writeln!(
                out,
                "  {:<6} {:<16} {:<8} {:<8}",
                node.node_id,
                node.status.label(),
                client,
                file
            );
        }

        let _ = writeln!(out, "\nCLIENTS");
        if self.clients.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for client in &self.clients {
            let _ = writeln!(
                out,
                "  {:<6} {:<16} since {:<8} node {:<4} files {:<3} pending {}",
                client.client_id,
                client.status.label(),
                client.waiting_from,
                opt_to_string(client.node_id),
                client.files,
                client.pending_weight
            );
        }

        let _ = writeln!(out, "\nFILES");
        for file in &self.files {
            let _ = writeln!(
                out,
                "  file {:<6} client {:<6} {:>8}/{:<8}",
                file.file_id, file.client_id, file.sent, file.weight
            );
        }
        out
    }
}

fn opt_to_string<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_flattens_files_with_owner() {
        let mut world = World::new(2);
        let a = world.insert_client(&[5, 1]).unwrap();
        let b = world.insert_client(&[2]).unwrap();

        let snap = world.snapshot();
        assert_eq!(snap.nodes.len(), 2);
        assert_eq!(snap.files.len(), 3);
        assert_eq!(snap.files[0].client_id, a);
        assert_eq!(snap.files[0].weight, 1);
        assert_eq!(snap.files[2].client_id, b);
        assert_eq!(snap.clients[0].pending_weight, 6);
    }

    #[test]
    fn snapshot_shows_node_of_sending_client() {
        let mut world = World::new(1);
        world.insert_client(&[2]).unwrap();
        world.tick();
        assert_eq!(world.snapshot().clients[0].node_id, Some(1));
    }

    #[test]
    fn snapshot_json_uses_status_labels() {
        let mut world = World::new(1);
        world.insert_client(&[3]).unwrap();
        world.tick();

        let json = world.snapshot().to_json().unwrap();
        assert!(json.contains("\"PROCESSING_FILE\""));
        assert!(json.contains("\"SENDING_FILE\""));
    }

    #[test]
    fn render_text_lists_everything() {
        let mut world = World::new(2);
        world.insert_client(&[3]).unwrap();
        world.tick();

        let text = world.snapshot().render_text();
        assert!(text.starts_with("tick 1"));
        assert!(text.contains("PROCESSING_FILE"));
        assert!(text.contains("WAITING"));
        assert!(text.contains("0/3"));
    }
}

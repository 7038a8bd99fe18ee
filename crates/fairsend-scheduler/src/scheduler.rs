//! World — the live client set, the node pool, and the tick engine.
//!
//! A tick runs three passes in order:
//! 1. Advance every in-flight transfer; finished head files are dropped,
//!    their node released, and drained clients removed
//! 2. Release nodes still processing for a client that is gone
//! 3. Hand each idle node to the waiting client with the lowest score
//!
//! The world is driven by exactly one tick source. Commands (`insert_client`,
//! `remove_client`, `clear`, `reset`) must run between ticks, never during one.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use fairsend_core::{Client, ClientId, ClientStatus, File, FileId, Node, NodeId, NodeStatus, Tick};

use crate::error::{InvariantViolation, SchedulerError, SchedulerResult};
use crate::scorer::select_candidate;

/// Summary of what one tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub now: Tick,
    /// Transfers advanced by one unit.
    pub advanced: usize,
    /// Head files that finished sending.
    pub completed: usize,
    /// Clients removed because their queue drained.
    pub clients_removed: usize,
    /// Nodes released because their client vanished.
    pub orphans_reclaimed: usize,
    /// New client → node bindings.
    pub assigned: usize,
}

/// A finished head file, collected before any mutation is applied.
struct Completion {
    client_id: ClientId,
    node_id: Option<NodeId>,
}

/// The simulated world: fixed node pool plus the live client set.
#[derive(Debug, Clone)]
pub struct World {
    clock: Tick,
    nodes: Vec<Node>,
    clients: Vec<Client>,
    next_file_id: FileId,
    next_client_id: ClientId,
}

impl World {
    /// Create a world with `node_count` idle nodes (ids `1..=node_count`).
    pub fn new(node_count: u32) -> Self {
        Self {
            clock: 0,
            nodes: make_nodes(node_count),
            clients: Vec::new(),
            next_file_id: 0,
            next_client_id: 0,
        }
    }

    /// Build a world from explicit state.
    ///
    /// Id counters continue after the highest ids present.
    pub fn from_parts(now: Tick, nodes: Vec<Node>, clients: Vec<Client>) -> Self {
        let next_file_id = clients
            .iter()
            .flat_map(|c| c.files.iter().map(|f| f.file_id + 1))
            .max()
            .unwrap_or(0);
        let next_client_id = clients
            .iter()
            .map(|c| c.client_id + 1)
            .max()
            .unwrap_or(0);
        Self {
            clock: now,
            nodes,
            clients,
            next_file_id,
            next_client_id,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn now(&self) -> Tick {
        self.clock
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn client(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| c.client_id == client_id)
    }

    pub fn client_mut(&mut self, client_id: ClientId) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.client_id == client_id)
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.node_id == node_id)
    }

    pub fn idle_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_idle()).count()
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Recreate the node pool and drop every client.
    ///
    /// The clock and id counters keep running, so file ids are never reused.
    pub fn reset(&mut self, node_count: u32) {
        self.nodes = make_nodes(node_count);
        self.clients.clear();
        info!(nodes = node_count, now = self.clock, "world reset");
    }

    /// Drop every client. Nodes are left as they are; any still processing
    /// are reclaimed by the next tick.
    pub fn clear(&mut self) {
        let removed = self.clients.len();
        self.clients.clear();
        info!(removed, "clients cleared");
    }

    /// Add a waiting client whose queue holds one file per weight.
    pub fn insert_client(&mut self, weights: &[u64]) -> SchedulerResult<ClientId> {
        if weights.is_empty() {
            return Err(SchedulerError::EmptyFileSet);
        }
        if weights.contains(&0) {
            return Err(SchedulerError::InvalidWeight);
        }

        let files = weights
            .iter()
            .map(|&weight| {
                let file = File::new(self.next_file_id, weight);
                self.next_file_id += 1;
                file
            })
            .collect();

        let client_id = self.next_client_id;
        self.next_client_id += 1;
        self.clients.push(Client::new(client_id, files, self.clock));

        debug!(client_id, files = weights.len(), now = self.clock, "client added");
        Ok(client_id)
    }

    /// Remove a client from the live set.
    ///
    /// A client removed mid-transfer releases its node immediately.
    pub fn remove_client(&mut self, client_id: ClientId) -> SchedulerResult<Client> {
        let idx = self
            .clients
            .iter()
            .position(|c| c.client_id == client_id)
            .ok_or(SchedulerError::ClientNotFound(client_id))?;
        let client = self.clients.remove(idx);

        if client.status == ClientStatus::SendingFile {
            if let Some(node) = client.node_id.and_then(|id| self.node_mut(id)) {
                if node.client_id == Some(client_id) {
                    node.release();
                    debug!(client_id, node_id = node.node_id, "node released on client removal");
                }
            }
        }

        info!(client_id, pending_files = client.files.len(), "client removed");
        Ok(client)
    }

    // ── Tick ────────────────────────────────────────────────────────

    /// Run one discrete simulation step.
    pub fn tick(&mut self) -> TickReport {
        self.clock += 1;
        let now = self.clock;
        let mut report = TickReport {
            now,
            ..TickReport::default()
        };

        self.advance_transfers(now, &mut report);
        self.reconcile_orphans(&mut report);
        self.assign_idle_nodes(now, &mut report);

        debug!(
            now,
            advanced = report.advanced,
            completed = report.completed,
            clients_removed = report.clients_removed,
            orphans = report.orphans_reclaimed,
            assigned = report.assigned,
            "tick"
        );
        report
    }

    /// Step 1. Progress is applied in place; completions are collected and
    /// applied in a second pass so the client set is never resized mid-scan.
    fn advance_transfers(&mut self, now: Tick, report: &mut TickReport) {
        let mut completions = Vec::new();

        for client in &mut self.clients {
            if client.status != ClientStatus::SendingFile {
                continue;
            }
            let client_id = client.client_id;
            let node_id = client.node_id;
            let Some(head) = client.head_mut() else {
                warn!(client_id, "sending client has no files");
                continue;
            };
            head.sent += 1;
            report.advanced += 1;

            if head.is_complete() {
                completions.push(Completion { client_id, node_id });
            }
        }

        let mut drained: HashSet<ClientId> = HashSet::new();
        for done in completions {
            if let Some(node) = done.node_id.and_then(|id| self.node_mut(id)) {
                node.release();
            }

            let Some(client) = self.client_mut(done.client_id) else {
                continue;
            };
            client.waiting_from = now;
            client.status = ClientStatus::Waiting;
            client.node_id = None;
            let file = client.files.remove(0);
            report.completed += 1;

            debug!(
                client_id = done.client_id,
                file_id = file.file_id,
                weight = file.weight,
                remaining_files = client.files.len(),
                "file sent"
            );

            if client.files.is_empty() {
                drained.insert(done.client_id);
            }
        }

        if !drained.is_empty() {
            self.clients.retain(|c| !drained.contains(&c.client_id));
            report.clients_removed = drained.len();
            debug!(removed = drained.len(), "drained clients removed");
        }
    }

    /// Step 2.
    fn reconcile_orphans(&mut self, report: &mut TickReport) {
        let live: HashSet<ClientId> = self.clients.iter().map(|c| c.client_id).collect();

        for node in &mut self.nodes {
            if node.status != NodeStatus::ProcessingFile {
                continue;
            }
            let orphaned = node.client_id.is_none_or(|id| !live.contains(&id));
            if orphaned {
                node.release();
                report.orphans_reclaimed += 1;
                debug!(node_id = node.node_id, client_id = ?node.client_id, "orphaned node reclaimed");
            }
        }
    }

    /// Step 3.
    fn assign_idle_nodes(&mut self, now: Tick, report: &mut TickReport) {
        for idx in 0..self.nodes.len() {
            if self.clients.is_empty() {
                break;
            }
            if !self.nodes[idx].is_idle() {
                continue;
            }

            // Candidates only shrink during the pass.
            let Some(best) = select_candidate(&self.clients, now) else {
                break;
            };

            let node = &mut self.nodes[idx];
            let client = &mut self.clients[best.position];
            let Some(file_id) = client.head().map(|f| f.file_id) else {
                continue;
            };

            client.waiting_from = now;
            client.node_id = Some(node.node_id);
            client.status = ClientStatus::SendingFile;
            node.bind(client.client_id, file_id);
            report.assigned += 1;

            debug!(
                node_id = node.node_id,
                client_id = client.client_id,
                file_id,
                score = best.score,
                weight_score = best.breakdown.weight,
                time_score = best.breakdown.time,
                "file assigned"
            );
        }
    }

    // ── Invariants ──────────────────────────────────────────────────

    /// Verify the client/node bookkeeping.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for client in &self.clients {
            if client.files.is_empty() {
                return Err(InvariantViolation::EmptyQueue(client.client_id));
            }
            for (i, file) in client.files.iter().enumerate() {
                if file.sent > file.weight {
                    return Err(InvariantViolation::SentExceedsWeight {
                        file_id: file.file_id,
                        sent: file.sent,
                        weight: file.weight,
                    });
                }
                if i > 0 && file.sent > 0 {
                    return Err(InvariantViolation::NonHeadProgress {
                        client_id: client.client_id,
                        file_id: file.file_id,
                    });
                }
            }
            if client.status == ClientStatus::SendingFile {
                let served = client.node_id.and_then(|id| self.node(id)).is_some_and(|n| {
                    n.status == NodeStatus::ProcessingFile && n.client_id == Some(client.client_id)
                });
                if !served {
                    return Err(InvariantViolation::UnboundClient {
                        client_id: client.client_id,
                        node_id: client.node_id,
                    });
                }
            }
        }

        for node in &self.nodes {
            let bound = self
                .clients
                .iter()
                .filter(|c| c.status == ClientStatus::SendingFile && c.node_id == Some(node.node_id))
                .count();
            match node.status {
                NodeStatus::ProcessingFile if bound != 1 => {
                    return Err(InvariantViolation::NodeBindingMismatch {
                        node_id: node.node_id,
                        bound,
                    });
                }
                NodeStatus::Waiting if bound > 0 => {
                    return Err(InvariantViolation::IdleNodeReferenced(node.node_id));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn make_nodes(node_count: u32) -> Vec<Node> {
    (1..=node_count).map(Node::new).collect()
}

//! Dispatch scoring for waiting clients.
//!
//! Lower score = served sooner. The score combines:
//! - **Weight**: `weight²` of the head file, a bias toward short jobs
//! - **Time**: `1 / elapsed²`, shrinking as the client waits longer
//!
//! Both terms are scaled by the live client count. Under contention the
//! weight term shrinks and the time term grows, so waiting time dominates.

use std::cmp::Ordering;

use fairsend_core::{Client, ClientId, File, Tick};

/// Elapsed time is clamped to this floor before scoring. A client released
/// and rescored within the same tick would otherwise divide by zero.
pub const MIN_ELAPSED_TICKS: u64 = 1;

/// Individual score components for debugging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// `weight² / live_clients`.
    pub weight: f64,
    /// `live_clients / elapsed²`.
    pub time: f64,
    pub total: f64,
}

/// Score of one eligible client.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub client_id: ClientId,
    /// Index of the client in the live set.
    pub position: usize,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Score a head file for a client waiting since `waiting_since`.
pub fn score(head: &File, waiting_since: Tick, live_clients: usize, now: Tick) -> f64 {
    score_breakdown(head, waiting_since, live_clients, now).total
}

pub fn score_breakdown(
    head: &File,
    waiting_since: Tick,
    live_clients: usize,
    now: Tick,
) -> ScoreBreakdown {
    let clients = live_clients.max(1) as f64;
    let weight = head.weight as f64;
    let elapsed = now.saturating_sub(waiting_since).max(MIN_ELAPSED_TICKS) as f64;

    let weight_score = weight.powi(2) / clients;
    let time_score = 1.0 / elapsed.powi(2) * clients;

    ScoreBreakdown {
        weight: weight_score,
        time: time_score,
        total: weight_score + time_score,
    }
}

/// Score every waiting client with a non-empty queue, best (lowest) first.
///
/// Ties keep live-set order.
pub fn rank_candidates(clients: &[Client], now: Tick) -> Vec<CandidateScore> {
    let live_clients = clients.len();
    let mut scores: Vec<CandidateScore> = clients
        .iter()
        .enumerate()
        .filter_map(|(position, client)| candidate_score(client, position, live_clients, now))
        .collect();

    scores.sort_by(|a, b| a.score.total_cmp(&b.score));
    scores
}

/// Pick the eligible client with the lowest score. First encountered wins ties.
pub fn select_candidate(clients: &[Client], now: Tick) -> Option<CandidateScore> {
    let live_clients = clients.len();
    clients
        .iter()
        .enumerate()
        .filter_map(|(position, client)| candidate_score(client, position, live_clients, now))
        .fold(None, |best: Option<CandidateScore>, curr| match best {
            Some(best) if best.score.total_cmp(&curr.score) != Ordering::Greater => Some(best),
            _ => Some(curr),
        })
}

fn candidate_score(
    client: &Client,
    position: usize,
    live_clients: usize,
    now: Tick,
) -> Option<CandidateScore> {
    if !client.is_waiting() {
        return None;
    }
    let head = client.head()?;
    let breakdown = score_breakdown(head, client.waiting_from, live_clients, now);
    Some(CandidateScore {
        client_id: client.client_id,
        position,
        score: breakdown.total,
        breakdown,
    })
}

//! Tick source — drives a `Simulation` on a fixed cadence.
//!
//! One tokio task owns the simulation. Interval ticks and incoming
//! commands are handled in the same `select!` loop, so a command can
//! never interleave with a tick in progress. Readers observe the world
//! through a `watch` channel of snapshots published after every change.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use fairsend_scheduler::WorldSnapshot;

use crate::simulation::{Command, Simulation};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver has stopped")]
    Stopped,

    #[error("driver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a running driver task.
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<WorldSnapshot>,
    task: JoinHandle<Simulation>,
}

impl DriverHandle {
    /// Queue a command. It runs between two ticks.
    pub async fn send(&self, command: Command) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DriverError::Stopped)
    }

    /// Subscribe to world snapshots.
    pub fn snapshots(&self) -> watch::Receiver<WorldSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end (shutdown signal or tick limit) and hand
    /// back the simulation.
    pub async fn join(self) -> Result<Simulation, DriverError> {
        Ok(self.task.await?)
    }
}

/// Spawn the driver loop.
///
/// The loop ends when `shutdown` changes or its sender is dropped. With
/// `tick_limit`, it also ends after that many ticks have been forwarded
/// to the world; ticks while stopped do not count.
pub fn spawn(
    sim: Simulation,
    interval: Duration,
    tick_limit: Option<u64>,
    shutdown: watch::Receiver<bool>,
) -> DriverHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (snapshot_tx, snapshot_rx) = watch::channel(sim.snapshot());

    let task = tokio::spawn(run(
        sim,
        interval,
        tick_limit,
        command_rx,
        snapshot_tx,
        shutdown,
    ));

    DriverHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        task,
    }
}

async fn run(
    mut sim: Simulation,
    interval: Duration,
    tick_limit: Option<u64>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<WorldSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) -> Simulation {
    info!(
        interval_ms = interval.as_millis() as u64,
        ?tick_limit,
        "tick source started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut forwarded: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(report) = sim.on_tick() else {
                    continue;
                };
                forwarded += 1;
                snapshots.send_replace(sim.snapshot());

                if cfg!(debug_assertions) {
                    if let Err(violation) = sim.world().check_invariants() {
                        warn!(now = report.now, %violation, "invariant violated");
                    }
                }

                if tick_limit.is_some_and(|limit| forwarded >= limit) {
                    info!(ticks = forwarded, "tick limit reached");
                    break;
                }
            }
            Some(command) = commands.recv() => {
                debug!(?command, "command received");
                if let Err(e) = sim.apply(command) {
                    warn!(?command, error = %e, "command failed");
                }
                snapshots.send_replace(sim.snapshot());
            }
            _ = shutdown.changed() => {
                info!("tick source shutting down");
                break;
            }
        }
    }

    sim
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairsend_core::SimConfig;

    fn running_sim() -> Simulation {
        let mut sim = Simulation::new(&SimConfig::scaffold(9)).unwrap();
        sim.init().unwrap();
        sim.set_running(true);
        sim
    }

    #[tokio::test]
    async fn stops_at_tick_limit() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn(running_sim(), Duration::from_millis(1), Some(10), shutdown_rx);

        let sim = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("driver did not finish")
            .unwrap();
        assert_eq!(sim.world().now(), 10);
        assert!(sim.world().check_invariants().is_ok());
    }

    #[tokio::test]
    async fn stopped_simulation_does_not_tick() {
        let sim = Simulation::new(&SimConfig::scaffold(9)).unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn(sim, Duration::from_millis(1), None, shutdown_rx);

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();
        let sim = handle.join().await.unwrap();
        assert_eq!(sim.world().now(), 0);
        assert!(!sim.is_running());
    }

    #[tokio::test]
    async fn commands_are_applied_and_published() {
        let sim = Simulation::new(&SimConfig::scaffold(9)).unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn(sim, Duration::from_millis(1), None, shutdown_rx);
        let mut snapshots = handle.snapshots();

        handle.send(Command::Init).await.unwrap();
        handle.send(Command::SetRunning(true)).await.unwrap();

        let reached = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                snapshots.changed().await.unwrap();
                let snap = snapshots.borrow_and_update().clone();
                if snap.now >= 3 {
                    return snap;
                }
            }
        })
        .await
        .expect("no tick observed");

        assert!(!reached.clients.is_empty());
        assert_eq!(reached.nodes.len(), 5);

        shutdown_tx.send(true).unwrap();
        let sim = handle.join().await.unwrap();
        assert!(sim.world().now() >= 3);
    }

    #[tokio::test]
    async fn failed_command_does_not_stop_driver() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn(running_sim(), Duration::from_millis(1), None, shutdown_rx);

        handle.send(Command::RemoveClient(10_000)).await.unwrap();
        handle.send(Command::AddClient).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!handle.is_finished());
        drop(shutdown_tx);
        handle.join().await.unwrap();
    }
}

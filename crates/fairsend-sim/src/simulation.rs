//! Simulation host — the command surface around a `World`.
//!
//! Commands arrive between ticks. Ticks are only forwarded to the world
//! while the simulation is running; a fresh simulation starts stopped.

use std::str::FromStr;

use thiserror::Error;
use tracing::info;

use fairsend_core::{ClientId, ConfigError, SimConfig};
use fairsend_scheduler::{SchedulerResult, TickReport, World, WorldSnapshot};

use crate::generator::WorkloadGenerator;

/// A user-issued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Recreate the node pool and a random client population.
    Init,
    /// Drop every client.
    Clear,
    /// Append one random client.
    AddClient,
    RemoveClient(ClientId),
    /// Start (`true`) or stop (`false`) forwarding ticks.
    SetRunning(bool),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("remove needs a client id")]
    MissingClientId,

    #[error("invalid client id: {0}")]
    InvalidClientId(String),
}

impl FromStr for Command {
    type Err = CommandParseError;

    /// Parses `init`, `clear`, `add`, `remove <id>`, `start`, `stop`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().ok_or(CommandParseError::Empty)?;

        match verb.to_ascii_lowercase().as_str() {
            "init" => Ok(Command::Init),
            "clear" => Ok(Command::Clear),
            "add" => Ok(Command::AddClient),
            "remove" | "rm" => {
                let raw = parts.next().ok_or(CommandParseError::MissingClientId)?;
                raw.parse()
                    .map(Command::RemoveClient)
                    .map_err(|_| CommandParseError::InvalidClientId(raw.to_string()))
            }
            "start" => Ok(Command::SetRunning(true)),
            "stop" => Ok(Command::SetRunning(false)),
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}

/// A world plus the generator and run toggle that feed it.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    generator: WorkloadGenerator,
    node_count: u32,
    running: bool,
}

impl Simulation {
    /// Create a stopped simulation with an idle node pool and no clients.
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world: World::new(config.simulation.nodes),
            generator: WorkloadGenerator::from_config(config),
            node_count: config.simulation.nodes,
            running: false,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.world.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Reset the world and generate a new population. Returns its size.
    pub fn init(&mut self) -> SchedulerResult<usize> {
        self.world.reset(self.node_count);
        let population = self.generator.population_size();
        for _ in 0..population {
            let weights = self.generator.client_weights();
            self.world.insert_client(&weights)?;
        }
        info!(clients = population, nodes = self.node_count, "simulation initialized");
        Ok(population as usize)
    }

    pub fn clear(&mut self) {
        self.world.clear();
    }

    pub fn add_client(&mut self) -> SchedulerResult<ClientId> {
        let weights = self.generator.client_weights();
        let client_id = self.world.insert_client(&weights)?;
        info!(client_id, files = weights.len(), "client added");
        Ok(client_id)
    }

    pub fn remove_client(&mut self, client_id: ClientId) -> SchedulerResult<()> {
        self.world.remove_client(client_id).map(|_| ())
    }

    pub fn set_running(&mut self, running: bool) {
        if self.running != running {
            info!(running, now = self.world.now(), "run state changed");
        }
        self.running = running;
    }

    /// Forward a tick to the world if running.
    pub fn on_tick(&mut self) -> Option<TickReport> {
        self.running.then(|| self.world.tick())
    }

    pub fn apply(&mut self, command: Command) -> SchedulerResult<()> {
        match command {
            Command::Init => self.init().map(|_| ()),
            Command::Clear => {
                self.clear();
                Ok(())
            }
            Command::AddClient => self.add_client().map(|_| ()),
            Command::RemoveClient(client_id) => self.remove_client(client_id),
            Command::SetRunning(running) => {
                self.set_running(running);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairsend_scheduler::SchedulerError;

    fn sim() -> Simulation {
        Simulation::new(&SimConfig::scaffold(5)).unwrap()
    }

    #[test]
    fn parse_commands() {
        assert_eq!("init".parse::<Command>(), Ok(Command::Init));
        assert_eq!(" Clear ".parse::<Command>(), Ok(Command::Clear));
        assert_eq!("add".parse::<Command>(), Ok(Command::AddClient));
        assert_eq!("remove 12".parse::<Command>(), Ok(Command::RemoveClient(12)));
        assert_eq!("start".parse::<Command>(), Ok(Command::SetRunning(true)));
        assert_eq!("stop".parse::<Command>(), Ok(Command::SetRunning(false)));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandParseError::Empty));
        assert_eq!("remove".parse::<Command>(), Err(CommandParseError::MissingClientId));
        assert_eq!(
            "remove x".parse::<Command>(),
            Err(CommandParseError::InvalidClientId("x".to_string()))
        );
        assert_eq!(
            "launch".parse::<Command>(),
            Err(CommandParseError::Unknown("launch".to_string()))
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = SimConfig::default();
        config.simulation.nodes = 0;
        assert!(matches!(Simulation::new(&config), Err(ConfigError::NoNodes)));
    }

    #[test]
    fn init_populates_world() {
        let mut sim = sim();
        let population = sim.init().unwrap();

        assert!((5..=8).contains(&population));
        assert_eq!(sim.world().clients().len(), population);
        assert_eq!(sim.world().nodes().len(), 5);
        assert!(sim.world().clients().iter().all(|c| {
            c.files.windows(2).all(|w| w[0].weight <= w[1].weight)
        }));
    }

    #[test]
    fn ticks_only_forwarded_while_running() {
        let mut sim = sim();
        sim.init().unwrap();

        assert!(sim.on_tick().is_none());
        assert_eq!(sim.world().now(), 0);

        sim.apply(Command::SetRunning(true)).unwrap();
        let report = sim.on_tick().unwrap();
        assert_eq!(report.now, 1);
        assert_eq!(report.assigned, 5);

        sim.apply(Command::SetRunning(false)).unwrap();
        assert!(sim.on_tick().is_none());
        assert_eq!(sim.world().now(), 1);
    }

    #[test]
    fn add_and_remove_clients() {
        let mut sim = sim();
        let id = sim.add_client().unwrap();
        assert_eq!(sim.world().clients().len(), 1);

        sim.apply(Command::RemoveClient(id)).unwrap();
        assert!(sim.world().clients().is_empty());
        assert_eq!(
            sim.apply(Command::RemoveClient(id)),
            Err(SchedulerError::ClientNotFound(id))
        );
    }

    #[test]
    fn clear_keeps_nodes() {
        let mut sim = sim();
        sim.init().unwrap();
        sim.apply(Command::Clear).unwrap();
        assert!(sim.world().clients().is_empty());
        assert_eq!(sim.world().nodes().len(), 5);
    }
}

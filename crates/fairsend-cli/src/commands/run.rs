//! `fairsend run` — initialize a population and drive the scheduler.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use fairsend_core::SimConfig;
use fairsend_scheduler::WorldSnapshot;
use fairsend_sim::{Command, DriverHandle, Simulation};

pub struct RunOptions {
    pub config: Option<String>,
    pub ticks: Option<u64>,
    pub interval_ms: Option<u64>,
    pub format: String,
    pub interactive: bool,
}

pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let config = load_config(&opts)?;

    let mut sim = Simulation::new(&config)?;
    let population = sim.init()?;
    sim.set_running(true);
    info!(
        clients = population,
        nodes = config.simulation.nodes,
        interval_ms = config.simulation.tick_interval_ms,
        "simulation starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let handle = fairsend_sim::spawn(sim, config.tick_interval(), opts.ticks, shutdown_rx);

    // Graceful shutdown on Ctrl-C.
    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = signal_tx.send(true);
        }
    });

    if opts.interactive {
        read_commands(&handle, &opts.format).await?;
        let _ = shutdown_tx.send(true);
    }

    let sim = handle.join().await?;
    info!(ticks = sim.world().now(), clients = sim.world().clients().len(), "simulation stopped");
    print_snapshot(&sim.snapshot(), &opts.format)
}

fn load_config(opts: &RunOptions) -> anyhow::Result<SimConfig> {
    let mut config = match &opts.config {
        Some(path) => SimConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to load config from {path}"))?,
        None => SimConfig::default(),
    };
    if let Some(interval_ms) = opts.interval_ms {
        config.simulation.tick_interval_ms = interval_ms;
    }
    config.validate()?;
    Ok(config)
}

/// Forward stdin lines to the driver until quit, EOF, or the driver stops.
async fn read_commands(handle: &DriverHandle, format: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut snapshots = handle.snapshots();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "" => continue,
                    "quit" | "exit" => break,
                    "show" => {
                        let snapshot = snapshots.borrow().clone();
                        print_snapshot(&snapshot, format)?;
                    }
                    input => match input.parse::<Command>() {
                        Ok(command) => {
                            if handle.send(command).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "unrecognized command"),
                    },
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &WorldSnapshot, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => println!("{}", snapshot.to_json()?),
        _ => println!("{}", snapshot.render_text()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(config: Option<String>, interval_ms: Option<u64>) -> RunOptions {
        RunOptions {
            config,
            ticks: Some(1),
            interval_ms,
            format: "text".to_string(),
            interactive: false,
        }
    }

    #[test]
    fn defaults_without_config_file() {
        let config = load_config(&options(None, None)).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn interval_override_is_validated() {
        let config = load_config(&options(None, Some(25))).unwrap();
        assert_eq!(config.simulation.tick_interval_ms, 25);

        assert!(load_config(&options(None, Some(0))).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(&options(Some(path.display().to_string()), None)).unwrap_err();
        assert!(err.to_string().contains("failed to load config"));
    }

    #[tokio::test]
    async fn bounded_run_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fairsend.toml");
        std::fs::write(&path, "[simulation]\nseed = 3\nnodes = 2\n").unwrap();

        let mut opts = options(Some(path.display().to_string()), None);
        opts.ticks = Some(5);
        opts.format = "json".to_string();
        run(opts).await.unwrap();
    }
}

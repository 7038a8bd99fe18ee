use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "fairsend",
    about = "fairsend — multi-node file transfer scheduling simulator",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a client population and run the scheduler.
    ///
    /// Without --ticks the simulation runs until Ctrl-C. With --interactive,
    /// stdin lines are read as commands: init, clear, add, remove <id>,
    /// start, stop, show, quit.
    Run {
        /// Path to fairsend.toml (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<String>,
        /// Stop after this many ticks
        #[arg(short, long)]
        ticks: Option<u64>,
        /// Override [simulation].tick_interval_ms
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Read commands from stdin while running
        #[arg(short, long)]
        interactive: bool,
    },
    /// Print the dispatch score of a head file
    Score {
        /// Head file weight
        #[arg(short, long)]
        weight: u64,
        /// Tick the client started waiting
        #[arg(long, default_value = "0")]
        waiting_since: u64,
        /// Current tick
        #[arg(long)]
        now: u64,
        /// Live client count
        #[arg(long, default_value = "1")]
        clients: usize,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a fairsend.toml scaffold
    InitConfig {
        #[arg(short, long, default_value = "fairsend.toml")]
        path: String,
        /// Generator seed to pin in the scaffold
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fairsend=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            interval_ms,
            format,
            interactive,
        } => {
            commands::run::run(commands::run::RunOptions {
                config,
                ticks,
                interval_ms,
                format,
                interactive,
            })
            .await
        }
        Commands::Score {
            weight,
            waiting_since,
            now,
            clients,
            format,
        } => commands::score::score(weight, waiting_since, now, clients, &format),
        Commands::InitConfig { path, seed } => commands::init_config::init_config(&path, seed),
    }
}

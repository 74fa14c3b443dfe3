use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hearth::agent::{Household, IdentityMap};
use hearth::config::{BackendKind, SimConfig};
use hearth::decision::create_decision_backend;
use hearth::observability::create_observer;
use hearth::sim::{Orchestrator, Phase};
use hearth::sink::JsonlSink;

#[derive(Parser)]
#[command(name = "hearth", about = "Household behavior simulation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print the summary.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of simulated days.
        #[arg(long)]
        days: Option<u32>,

        /// First simulated date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Seed for every random stream.
        #[arg(long)]
        seed: Option<u64>,

        /// Write records as JSON lines to FILE (write mode).
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,

        /// Decision backend: rules or remote.
        #[arg(long)]
        backend: Option<BackendKind>,

        /// Report progress for every simulated day.
        #[arg(long)]
        verbose: bool,

        /// Print the result as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the phase schedule.
    Phases {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SimConfig> {
    let config = match path {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "hearth=debug" } else { "hearth=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Phases { config } => {
            let config = load_config(config.as_ref())?;
            let schedule = config.phase_boundaries;
            println!();
            println!(
                "{:<12} {:>12} {:>12} {:>10} {:>9}",
                "Phase", "Days", "Habit bonus", "Activity", "Meetings"
            );
            println!("{}", "-".repeat(59));
            for phase in Phase::ALL {
                let range = schedule.range(phase, config.days);
                let days = if range.is_empty() {
                    "-".to_string()
                } else {
                    format!("{}-{}", range.start + 1, range.end)
                };
                println!(
                    "{:<12} {:>12} {:>12.1} {:>9.1}x {:>9}",
                    phase.as_str(),
                    days,
                    phase.habit_bonus(),
                    phase.activity_scale(),
                    if phase.allows_meetings() { "yes" } else { "no" }
                );
            }
            println!();
        }
        Commands::Run {
            config: config_path,
            days,
            start,
            seed,
            write,
            backend,
            verbose,
            json,
        } => {
            let mut config = load_config(config_path.as_ref())?;

            // CLI overrides
            if let Some(days) = days {
                config.days = days;
            }
            if let Some(start) = start {
                config.start_date = start;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(path) = write {
                config.write_mode = true;
                config.sink.path = Some(path);
            }
            if let Some(kind) = backend {
                config.backend.kind = kind;
            }
            config.verbose |= verbose;
            config.validate()?;

            init_tracing(config.verbose);

            let identities = match &config.identities {
                Some(path) => IdentityMap::from_file(path)?,
                None => IdentityMap::generated(config.seed),
            };
            let mut household = Household::from_identities(&identities, config.seed)?;
            let backend = create_decision_backend(&config.backend)?;
            household.attach_backend(backend, config.backend.decision_timeout());

            let observer = create_observer(config.verbose);
            let sink_path = config.sink.path.clone().filter(|_| config.write_mode);
            let mut orchestrator = Orchestrator::new(config, household, observer)?;
            if let Some(path) = sink_path {
                let sink = JsonlSink::create(&path).await?;
                tracing::info!(path = %path.display(), "Writing records");
                orchestrator = orchestrator.with_sink(Arc::new(sink));
            }

            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, stopping after the current day");
                    interrupt.cancel();
                }
            });

            let result = orchestrator.run(cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", result.render_table());
            }
        }
    }

    Ok(())
}

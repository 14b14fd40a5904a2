//! CLI entry point for the sensor ingest simulator.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sensor_ingest_simulator::{run_workload, Config, TaskTable, TrafficModel};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sensor-ingest-simulator")]
#[command(about = "Synthetic IoT sensor traffic generator for ingestion endpoints")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run simulated users against the ingest endpoint
    Run {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Server URL
        #[arg(short, long)]
        server: Option<String>,

        /// Number of simulated users
        #[arg(short, long)]
        users: Option<usize>,

        /// Duration in seconds
        #[arg(short = 'D', long)]
        duration: Option<f64>,

        /// Minimum wait between tasks, in seconds
        #[arg(long)]
        min_wait: Option<f64>,

        /// Maximum wait between tasks, in seconds
        #[arg(long)]
        max_wait: Option<f64>,

        #[command(flatten)]
        weights: WeightArgs,

        /// Seed for reproducible traffic
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for report (markdown)
        #[arg(short, long)]
        output: Option<String>,

        /// Also output JSON report next to the markdown one
        #[arg(long)]
        json: bool,
    },

    /// Print generated payloads as JSON lines without sending them
    Sample {
        /// Number of payloads
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        weights: WeightArgs,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(default_value = "simulator.yml")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct WeightArgs {
    /// Weight of known-device traffic
    #[arg(long)]
    known_weight: Option<u32>,

    /// Weight of unknown-device traffic
    #[arg(long)]
    unknown_weight: Option<u32>,
}

impl WeightArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(w) = self.known_weight {
            config.tasks.known_device = w;
        }
        if let Some(w) = self.unknown_weight {
            config.tasks.unknown_device = w;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            server,
            users,
            duration,
            min_wait,
            max_wait,
            weights,
            seed,
            output,
            json,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => Config::default(),
            };
            if let Some(server) = server {
                config.server_url = server;
            }
            if let Some(users) = users {
                config.users = users;
            }
            if let Some(duration) = duration {
                config.duration_secs = duration;
            }
            if let Some(min_wait) = min_wait {
                config.pacing.min_wait_secs = min_wait;
            }
            if let Some(max_wait) = max_wait {
                config.pacing.max_wait_secs = max_wait;
            }
            weights.apply(&mut config);
            if seed.is_some() {
                config.seed = seed;
            }
            if output.is_some() {
                config.output_file = output;
            }
            config.validate()?;

            let shutdown = CancellationToken::new();
            tokio::spawn(watch_signals(shutdown.clone()));

            let report = run_workload(config.clone(), shutdown).await?;
            report.print_summary();

            if let Some(output_path) = &config.output_file {
                let md_path = if output_path.ends_with(".md") {
                    output_path.clone()
                } else {
                    format!("{}.md", output_path)
                };

                std::fs::write(&md_path, report.to_markdown())
                    .with_context(|| format!("Failed to write {}", md_path))?;
                info!("Markdown report saved to: {}", md_path);

                if json {
                    let json_path = format!("{}.json", md_path.trim_end_matches(".md"));
                    std::fs::write(&json_path, report.to_json()?)
                        .with_context(|| format!("Failed to write {}", json_path))?;
                    info!("JSON report saved to: {}", json_path);
                }
            }
        }

        Commands::Sample {
            count,
            seed,
            weights,
        } => {
            let mut config = Config::default();
            weights.apply(&mut config);
            let table = TaskTable::new(&config.tasks)?;
            let model = TrafficModel::new();
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            for _ in 0..count {
                let task = table.select(&mut rng);
                let payload = model.payload_for(task, &mut rng);
                println!("{}", serde_json::to_string(&payload)?);
            }
        }

        Commands::InitConfig { path } => {
            Config::write_default(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Default configuration written to {}", path.display());
        }
    }

    Ok(())
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("SIGINT received, stopping simulated users...");
        }
        _ = terminate => {
            info!("SIGTERM received, stopping simulated users...");
        }
    }

    shutdown.cancel();
}

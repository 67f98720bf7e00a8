//! cwtune - learn contention-window settings against a network simulator
//!
//! Connects to (or launches) a simulator exposing the gym bridge, runs the
//! epsilon-greedy learning loop for the requested number of episodes and
//! prints what was learned.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::format_push_string)]

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cwtune_core::util::load_env_file;
use cwtune_gym::{Ns3Env, Ns3EnvConfig};
use cwtune_rl::LearningController;

mod config;
mod report;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "cwtune")]
#[command(author, version, long_about = None)]
#[command(about = "cwtune - contention window tuning with ns-3")]
struct Cli {
    /// Start the simulator process (0 or 1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    start: Option<u8>,

    /// Number of episodes
    #[arg(long, env = "CWTUNE_ITERATIONS", value_parser = clap::value_parser!(u32).range(1..))]
    iterations: Option<u32>,

    /// Simulator bridge port
    #[arg(long)]
    port: Option<u16>,

    /// Simulated time per episode, in seconds
    #[arg(long)]
    sim_time: Option<f64>,

    /// Control interval, in seconds
    #[arg(long)]
    step_time: Option<f64>,

    /// Simulator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Exploration probability
    #[arg(long)]
    epsilon: Option<f64>,

    /// Show simulator output and per-step logs
    #[arg(long)]
    debug: bool,

    /// Configuration file
    #[arg(short, long, env = "CWTUNE_CONFIG")]
    config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags win over file and environment settings
    fn apply(&self, config: &mut Config) {
        if let Some(start) = self.start {
            config.simulator.start = start == 1;
        }
        if let Some(iterations) = self.iterations {
            config.learning.iterations = iterations;
        }
        if let Some(port) = self.port {
            config.simulator.port = port;
        }
        if let Some(sim_time) = self.sim_time {
            config.simulator.sim_time = sim_time;
        }
        if let Some(step_time) = self.step_time {
            config.simulator.step_time = step_time;
        }
        if let Some(seed) = self.seed {
            config.simulator.seed = seed;
        }
        if let Some(epsilon) = self.epsilon {
            config.learning.learner.epsilon = epsilon;
        }
        if self.debug {
            config.simulator.debug = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from cwtune.env file (before parsing args)
    load_env_file();

    let cli = Cli::parse();

    let log_level = if cli.verbose || cli.debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                ["cwtune", "cwtune_cli", "cwtune_rl", "cwtune_gym", "cwtune_core"]
                    .map(|target| format!("{target}={log_level}"))
                    .join(",")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let iterations = config.learning.iterations;
    let env_config = config.ns3_env_config();
    info!(
        port = env_config.port,
        start_sim = env_config.start_sim,
        sim_time = env_config.sim_time,
        step_time = env_config.step_time,
        seed = env_config.seed,
        iterations,
        "Starting cwtune"
    );

    let mut controller = LearningController::new(&config.learner_config())
        .context("Invalid learning configuration")?;
    info!("Learner parameters: {}", controller.params());

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let Some(mut env) = connect_until(&env_config, shutdown.as_mut()).await? else {
        println!("Ctrl-C -> Exit");
        println!("Done");
        return Ok(());
    };

    let summary = controller
        .run(&mut env, iterations, shutdown.as_mut())
        .await
        .context("Learning run failed")?;

    report::print_summary(&summary, controller.table(), cli.json)?;

    if summary.interrupted {
        println!("Ctrl-C -> Exit");
    }
    println!("Done");

    Ok(())
}

/// Connect to the simulator unless `interrupt` fires first.
///
/// Dropping the pending connect kills a simulator it launched.
async fn connect_until<F>(config: &Ns3EnvConfig, interrupt: F) -> Result<Option<Ns3Env>>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = interrupt => {
            info!("Interrupted while connecting to the simulator");
            Ok(None)
        }
        result = Ns3Env::connect(config) => {
            result.map(Some).context("Failed to connect to the simulator")
        }
    }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}. Using Ctrl+C only.", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            info!("Received SIGTERM");
        }
    }
}

//! Configuration loading for the cwtune CLI

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;

use cwtune_gym::Ns3EnvConfig;
use cwtune_rl::LearnerConfig;

/// Configuration for a learning run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulator: SimulatorConfig,
    pub learning: LearningConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub host: String,
    pub port: u16,
    pub start: bool,
    pub sim_time: f64,
    pub step_time: f64,
    pub seed: u64,
    pub debug: bool,
    pub command: String,
    pub scenario: Option<String>,
    pub args: BTreeMap<String, String>,
    pub connect_timeout_ms: u64,
    pub connect_retries: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        let env = Ns3EnvConfig::default();
        Self {
            host: env.host,
            port: env.port,
            start: env.start_sim,
            sim_time: env.sim_time,
            step_time: env.step_time,
            seed: env.seed,
            debug: env.debug,
            command: env.sim_command,
            scenario: env.scenario,
            args: env.sim_args,
            connect_timeout_ms: env.connect_timeout.as_millis() as u64,
            connect_retries: env.connect_retries,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Episodes per run
    pub iterations: u32,
    #[serde(flatten)]
    pub learner: LearnerConfig,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            learner: LearnerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// An explicit path must exist; otherwise the standard locations are
    /// searched and defaults are used when none is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = &config_path {
            tracing::info!("Loading config from: {:?}", path);
            builder = builder.add_source(File::from(path.clone()).required(explicit.is_some()));
        } else {
            tracing::info!("No config file found, using defaults");
        }

        // Environment variables with CWTUNE__ prefix, e.g. CWTUNE__SIMULATOR__PORT
        builder = builder.add_source(
            Environment::with_prefix("CWTUNE")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if config.learning.iterations == 0 {
            bail!("learning.iterations must be at least 1");
        }

        Ok(config)
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: CWTUNE_CONFIG env, ./cwtune.toml, ~/.config/cwtune/cwtune.toml
        if let Ok(path) = std::env::var("CWTUNE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("cwtune.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("cwtune").join("cwtune.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    pub fn ns3_env_config(&self) -> Ns3EnvConfig {
        let sim = &self.simulator;
        Ns3EnvConfig {
            host: sim.host.clone(),
            port: sim.port,
            step_time: sim.step_time,
            sim_time: sim.sim_time,
            seed: sim.seed,
            start_sim: sim.start,
            sim_command: sim.command.clone(),
            scenario: sim.scenario.clone().filter(|s| !s.is_empty()),
            sim_args: sim.args.clone(),
            debug: sim.debug,
            connect_timeout: Duration::from_millis(sim.connect_timeout_ms),
            connect_retries: sim.connect_retries,
        }
    }

    pub fn learner_config(&self) -> LearnerConfig {
        self.learning.learner.clone()
    }
}

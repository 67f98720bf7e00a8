//! Simulator environment reached over the bridge

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use cwtune_core::bridge::{methods, ResetResponse, SpacesResponse, StepParams};
use cwtune_core::{Action, Observation, Result, Space, StepOutcome};

use crate::client::BridgeClient;
use crate::env::Environment;
use crate::launcher::SimProcess;

/// Connection and launch settings for the simulator
#[derive(Debug, Clone)]
pub struct Ns3EnvConfig {
    pub host: String,
    pub port: u16,
    /// Seconds of simulated time per control step
    pub step_time: f64,
    /// Seconds of simulated time per episode
    pub sim_time: f64,
    pub seed: u64,
    /// Launch the simulator instead of attaching to a running one
    pub start_sim: bool,
    pub sim_command: String,
    pub scenario: Option<String>,
    /// Extra `--key=value` arguments for the scenario
    pub sim_args: BTreeMap<String, String>,
    pub debug: bool,
    pub connect_timeout: Duration,
    pub connect_retries: u32,
}

impl Default for Ns3EnvConfig {
    fn default() -> Self {
        let mut sim_args = BTreeMap::new();
        sim_args.insert("testArg".to_string(), "123".to_string());
        sim_args.insert("distance".to_string(), "500".to_string());

        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
            step_time: 10.0,
            sim_time: 600.0,
            seed: 0,
            start_sim: false,
            sim_command: "./waf".to_string(),
            scenario: Some("lorawan-openAI-gym".to_string()),
            sim_args,
            debug: false,
            connect_timeout: Duration::from_millis(2000),
            connect_retries: 10,
        }
    }
}

impl Ns3EnvConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Network simulator exposed as an [`Environment`]
pub struct Ns3Env {
    client: BridgeClient,
    process: Option<SimProcess>,
    observation_space: Space,
    action_space: Space,
    rng: StdRng,
    closed: bool,
}

impl Ns3Env {
    /// Launch (when configured) and connect to the simulator, then fetch its spaces
    pub async fn connect(config: &Ns3EnvConfig) -> Result<Self> {
        let mut process = if config.start_sim {
            Some(SimProcess::spawn(config)?)
        } else {
            None
        };

        let connected = async {
            let mut client = BridgeClient::connect(
                config.url(),
                config.connect_timeout,
                config.connect_retries,
            )
            .await?;
            let spaces: SpacesResponse = client
                .call_as(methods::SPACES, serde_json::json!({}))
                .await?;
            Ok::<_, cwtune_core::CwTuneError>((client, spaces))
        }
        .await;

        let (client, spaces) = match connected {
            Ok(ok) => ok,
            Err(e) => {
                if let Some(process) = process.as_mut() {
                    if let Err(stop_err) = process.stop().await {
                        warn!("Failed to stop simulator: {}", stop_err);
                    }
                }
                return Err(e);
            }
        };

        info!("Observation space: {}", spaces.observation_space);
        info!("Action space: {}", spaces.action_space);

        Ok(Self {
            client,
            process,
            observation_space: spaces.observation_space,
            action_space: spaces.action_space,
            rng: StdRng::seed_from_u64(config.seed),
            closed: false,
        })
    }
}

#[async_trait]
impl Environment for Ns3Env {
    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    async fn reset(&mut self) -> Result<Observation> {
        let response: ResetResponse = self
            .client
            .call_as(methods::RESET, serde_json::json!({}))
            .await?;
        debug!("Reset observation: {}", response.observation);
        Ok(response.observation)
    }

    async fn step(&mut self, action: Action) -> Result<StepOutcome> {
        if !self.action_space.contains(action) {
            debug!("Action {} lies outside {}", action, self.action_space);
        }

        let params = StepParams {
            action: self.action_space.broadcast(action),
        };
        self.client
            .call_as(methods::STEP, serde_json::to_value(params)?)
            .await
    }

    fn sample_action(&mut self) -> Result<Action> {
        self.action_space.sample(&mut self.rng)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let disconnect = self.client.close().await;

        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.stop().await {
                warn!("Failed to stop simulator: {}", e);
            }
        }

        disconnect
    }
}

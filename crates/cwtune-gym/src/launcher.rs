//! Simulator process launcher

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use cwtune_core::{CwTuneError, Result};

use crate::ns3::Ns3EnvConfig;

/// A simulator started by the agent, killed when the environment closes
pub struct SimProcess {
    child: Child,
}

impl SimProcess {
    /// Arguments passed to the simulation scenario
    pub fn scenario_args(config: &Ns3EnvConfig) -> Vec<String> {
        let mut args = vec![
            format!("--openGymPort={}", config.port),
            format!("--simSeed={}", config.seed),
            format!("--simTime={}", config.sim_time),
            format!("--envStepTime={}", config.step_time),
        ];
        for (key, value) in &config.sim_args {
            args.push(format!("--{}={}", key.trim_start_matches('-'), value));
        }
        args
    }

    /// Program and argv used to start the simulator.
    ///
    /// With a scenario name the arguments are folded into a single
    /// `--run "<scenario> <args>"` argument, the form `waf` expects.
    pub fn command_line(config: &Ns3EnvConfig) -> (String, Vec<String>) {
        let args = Self::scenario_args(config);
        match &config.scenario {
            Some(scenario) => (
                config.sim_command.clone(),
                vec![
                    "--run".to_string(),
                    format!("{} {}", scenario, args.join(" ")),
                ],
            ),
            None => (config.sim_command.clone(), args),
        }
    }

    /// Start the simulator in the background
    pub fn spawn(config: &Ns3EnvConfig) -> Result<Self> {
        let (program, args) = Self::command_line(config);

        if config.debug {
            info!("Starting simulator: {} {}", program, args.join(" "));
        } else {
            debug!("Starting simulator: {} {}", program, args.join(" "));
        }

        let mut command = Command::new(&program);
        command.args(&args).kill_on_drop(true).stdin(Stdio::null());
        if !config.debug {
            command.stdout(Stdio::null());
        }

        let child = command
            .spawn()
            .map_err(|e| CwTuneError::Simulator(format!("Failed to start {program}: {e}")))?;

        info!("Simulator started (pid {:?})", child.id());
        Ok(Self { child })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the simulator if it is still running
    pub async fn stop(&mut self) -> Result<()> {
        match self.child.try_wait()? {
            Some(status) => {
                debug!("Simulator already exited: {}", status);
            }
            None => {
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to kill simulator: {}", e);
                    return Err(e.into());
                }
                info!("Simulator stopped");
            }
        }
        Ok(())
    }
}

//! Learning loop controller
//!
//! Drives an [`Environment`] episode by episode, choosing contention windows
//! with an epsilon-greedy policy over a table of the best reward seen per
//! (state bucket, action).

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info, warn};

use cwtune_core::{Result, Reward};
use cwtune_gym::Environment;

use crate::discretize::{Discretizer, OutOfRange, DEFAULT_BUCKET_WIDTH};
use crate::policy::{Choice, EpsilonGreedy, DEFAULT_EPSILON};
use crate::stats::{EpisodeStats, RunSummary};
use crate::table::{ValueTable, DEFAULT_ACTIONS, DEFAULT_BUCKETS};

/// Tunables of the learning loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub epsilon: f64,
    /// Stored and reported only; the update rule is max-tracking
    pub learning_rate: f64,
    /// Stored and reported only; the update rule is max-tracking
    pub discount_factor: f64,
    pub buckets: usize,
    pub actions: usize,
    pub bucket_width: f64,
    pub out_of_range: OutOfRange,
    /// Seed for exploration draws; entropy when unset
    pub rng_seed: Option<u64>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            learning_rate: 0.1,
            discount_factor: 0.6,
            buckets: DEFAULT_BUCKETS,
            actions: DEFAULT_ACTIONS,
            bucket_width: DEFAULT_BUCKET_WIDTH,
            out_of_range: OutOfRange::Fail,
            rng_seed: None,
        }
    }
}

/// Owns the value table and iterates episodes against an environment
pub struct LearningController<R = StdRng> {
    table: ValueTable,
    discretizer: Discretizer,
    policy: EpsilonGreedy,
    learning_rate: f64,
    discount_factor: f64,
    rng: R,
    episode: u32,
    step: u64,
    rx_packets: f64,
    total_steps: u64,
}

impl LearningController<StdRng> {
    pub fn new(config: &LearnerConfig) -> Result<Self> {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> LearningController<R> {
    /// Build a controller drawing exploration decisions from `rng`
    pub fn with_rng(config: &LearnerConfig, rng: R) -> Result<Self> {
        let discretizer =
            Discretizer::new(config.bucket_width, config.buckets, config.out_of_range)?;
        if config.actions == 0 {
            return Err(cwtune_core::CwTuneError::Config(
                "action count must be positive".to_string(),
            ));
        }

        Ok(Self {
            table: ValueTable::new(config.buckets, config.actions),
            discretizer,
            policy: EpsilonGreedy::new(config.epsilon)?,
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            rng,
            episode: 0,
            step: 0,
            rx_packets: 0.0,
            total_steps: 0,
        })
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn epsilon(&self) -> f64 {
        self.policy.epsilon()
    }

    /// Configured but unused by the max-tracking update
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Configured but unused by the max-tracking update
    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Step index within the current episode
    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Controller parameters as JSON
    pub fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "epsilon": self.policy.epsilon(),
            "learning_rate": self.learning_rate,
            "discount_factor": self.discount_factor,
            "buckets": self.table.buckets(),
            "actions": self.table.actions(),
        })
    }

    /// Run `iterations` episodes, or until `interrupt` resolves.
    ///
    /// The environment is closed exactly once on every exit path. An
    /// interrupt is not an error: the summary is returned with
    /// `interrupted` set.
    pub async fn run<E, F>(
        &mut self,
        env: &mut E,
        iterations: u32,
        interrupt: F,
    ) -> Result<RunSummary>
    where
        E: Environment + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        let result = self.run_episodes(&mut *env, iterations, &mut interrupt).await;
        let closed = env.close().await;

        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close environment: {}", close_err);
                }
                return Err(e);
            }
        };
        closed?;

        if summary.interrupted {
            info!("Interrupted after {} episodes", summary.completed_episodes());
        }
        Ok(summary)
    }

    async fn run_episodes<E, F>(
        &mut self,
        env: &mut E,
        iterations: u32,
        interrupt: &mut Pin<&mut F>,
    ) -> Result<RunSummary>
    where
        E: Environment + ?Sized,
        F: Future<Output = ()>,
    {
        let mut episodes = Vec::new();
        let mut interrupted = false;

        'episodes: for episode in 0..iterations {
            self.episode = episode;

            let Some(observation) = interruptible(interrupt, env.reset()).await? else {
                interrupted = true;
                break;
            };

            self.step = 0;
            self.rx_packets = 0.0;
            let mut reward: Reward = 0.0;
            let mut bucket = self.discretizer.bucket(&observation)?;
            let started_at = Utc::now();
            let mut explored = 0;
            let mut exploited = 0;

            info!(episode, bucket, "Start iteration");
            debug!("State: {}", observation);

            loop {
                self.step += 1;
                self.total_steps += 1;
                self.rx_packets += reward;

                let selection = self
                    .policy
                    .select(&mut self.rng, &self.table, bucket, &mut *env)?;
                match selection.choice {
                    Choice::Explore => explored += 1,
                    Choice::Exploit => exploited += 1,
                }

                let step = env.step(selection.action);
                let Some(outcome) = interruptible(interrupt, step).await? else {
                    interrupted = true;
                    break 'episodes;
                };

                bucket = self.discretizer.bucket(&outcome.observation)?;
                let value = self
                    .table
                    .update_max(bucket, selection.action, outcome.reward)?;

                debug!(
                    step = self.step,
                    action = %selection.action,
                    choice = ?selection.choice,
                    reward = outcome.reward,
                    done = outcome.done,
                    bucket,
                    value,
                    info = %outcome.info,
                    "Step"
                );

                reward = outcome.reward;

                if outcome.done {
                    episodes.push(EpisodeStats {
                        episode,
                        steps: self.step,
                        rx_packets: self.rx_packets,
                        explored,
                        exploited,
                        started_at,
                        finished_at: Utc::now(),
                    });
                    info!(episode, steps = self.step, "All rx pkts num: {}", self.rx_packets);

                    self.step = 0;
                    self.rx_packets = 0.0;

                    // Redundant with the reset at the top of the next episode
                    if episode + 1 < iterations
                        && interruptible(interrupt, env.reset()).await?.is_none()
                    {
                        interrupted = true;
                        break 'episodes;
                    }
                    break;
                }
            }
        }

        Ok(RunSummary {
            episodes,
            interrupted,
            total_steps: self.total_steps,
            policy: self.table.policy(),
        })
    }
}

/// Await an environment call unless the interrupt fires first
async fn interruptible<T, F>(
    interrupt: &mut Pin<&mut F>,
    call: impl Future<Output = Result<T>>,
) -> Result<Option<T>>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = interrupt.as_mut() => Ok(None),
        result = call => result.map(Some),
    }
}

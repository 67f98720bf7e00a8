//! Integration tests for the learning loop
//!
//! These tests drive `LearningController` against a scripted environment
//! that counts every reset, step and close call.

#![allow(clippy::float_cmp)]
#![allow(clippy::cast_precision_loss)]

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::oneshot;

use cwtune_core::{Action, CwTuneError, Dtype, Observation, Result, Space, StepOutcome};
use cwtune_gym::Environment;
use cwtune_rl::{LearnerConfig, LearningController, OutOfRange};

/// Deterministic environment replaying the same episode script
struct ScriptedEnv {
    observation_space: Space,
    action_space: Space,
    initial: Observation,
    script: Vec<StepOutcome>,
    cursor: usize,
    fixed_action: Option<Action>,
    rng: StdRng,
    resets: u32,
    closes: u32,
    total_steps: usize,
    actions: Vec<Action>,
    interrupt_after: Option<(usize, oneshot::Sender<()>)>,
    fail_at_step: Option<usize>,
}

impl ScriptedEnv {
    fn new(initial: Vec<f64>, script: Vec<StepOutcome>) -> Self {
        Self {
            observation_space: Space::Box {
                low: 0.0,
                high: 10_000.0,
                shape: vec![initial.len()],
                dtype: Dtype::Float64,
            },
            action_space: Space::Discrete { n: 13 },
            initial: Observation::new(initial),
            script,
            cursor: 0,
            fixed_action: None,
            rng: StdRng::seed_from_u64(11),
            resets: 0,
            closes: 0,
            total_steps: 0,
            actions: Vec::new(),
            interrupt_after: None,
            fail_at_step: None,
        }
    }

    /// Episode of `len` steps at a constant observation, rewards 1..=len
    fn constant(mean: f64, len: usize) -> Self {
        let script = (1..=len)
            .map(|i| StepOutcome::new(vec![mean], i as f64, i == len))
            .collect();
        Self::new(vec![mean], script)
    }

    fn with_fixed_action(mut self, action: Action) -> Self {
        self.fixed_action = Some(action);
        self
    }

    fn interrupt_after(&mut self, steps: usize) -> impl std::future::Future<Output = ()> {
        let (tx, rx) = oneshot::channel();
        self.interrupt_after = Some((steps, tx));
        async move {
            let _ = rx.await;
        }
    }
}

#[async_trait]
impl Environment for ScriptedEnv {
    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    async fn reset(&mut self) -> Result<Observation> {
        self.resets += 1;
        self.cursor = 0;
        Ok(self.initial.clone())
    }

    async fn step(&mut self, action: Action) -> Result<StepOutcome> {
        self.total_steps += 1;
        if self.fail_at_step == Some(self.total_steps) {
            return Err(CwTuneError::Connection("simulator went away".to_string()));
        }

        self.actions.push(action);
        let outcome = self.script[self.cursor.min(self.script.len() - 1)].clone();
        self.cursor += 1;

        if let Some((after, _)) = &self.interrupt_after {
            if self.total_steps >= *after {
                if let Some((_, tx)) = self.interrupt_after.take() {
                    let _ = tx.send(());
                }
            }
        }

        Ok(outcome)
    }

    fn sample_action(&mut self) -> Result<Action> {
        match self.fixed_action {
            Some(action) => Ok(action),
            None => self.action_space.sample(&mut self.rng),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}

fn config(epsilon: f64) -> LearnerConfig {
    LearnerConfig {
        epsilon,
        rng_seed: Some(7),
        ..LearnerConfig::default()
    }
}

#[tokio::test]
async fn test_max_tracking_scenario() {
    let script = vec![
        StepOutcome::new(vec![4500.0], 7.0, false),
        StepOutcome::new(vec![4000.0, 5000.0], 3.0, true),
    ];
    let mut env = ScriptedEnv::new(vec![4500.0], script).with_fixed_action(Action(3));
    let mut controller = LearningController::new(&config(1.0)).unwrap();

    let summary = controller
        .run(&mut env, 1, std::future::pending())
        .await
        .unwrap();

    assert_eq!(controller.table().get(4, Action(3)).unwrap(), 7.0);
    assert_eq!(env.actions, vec![Action(3), Action(3)]);
    assert_eq!(summary.policy.len(), 1);
    assert_eq!(summary.policy[0].bucket, 4);
    assert_eq!(summary.policy[0].action, Action(3));
}

#[tokio::test]
async fn test_single_iteration_has_no_extra_reset() {
    let mut env = ScriptedEnv::constant(2500.0, 5);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let summary = controller
        .run(&mut env, 1, std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.completed_episodes(), 1);
    assert!(!summary.interrupted);
    assert_eq!(env.resets, 1);
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_extra_reset_between_episodes() {
    let mut env = ScriptedEnv::constant(2500.0, 3);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let summary = controller
        .run(&mut env, 3, std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.completed_episodes(), 3);
    // One reset per episode plus one after each episode but the last
    assert_eq!(env.resets, 5);
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_step_counter_per_episode() {
    let mut env = ScriptedEnv::constant(1500.0, 4);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let summary = controller
        .run(&mut env, 3, std::future::pending())
        .await
        .unwrap();

    for (i, episode) in summary.episodes.iter().enumerate() {
        assert_eq!(episode.episode, i as u32);
        assert_eq!(episode.steps, 4);
        assert_eq!(episode.explored + episode.exploited, 4);
    }
    assert_eq!(summary.total_steps, 12);
    assert_eq!(controller.current_step(), 0);
    assert_eq!(env.total_steps, 12);
}

#[tokio::test]
async fn test_rx_packets_count_previous_rewards() {
    // Rewards 1, 2, 3, 4: each step adds the reward of the step before it
    let mut env = ScriptedEnv::constant(1500.0, 4);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let summary = controller
        .run(&mut env, 2, std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.episodes[0].rx_packets, 6.0);
    assert_eq!(summary.episodes[1].rx_packets, 6.0);
    assert_eq!(summary.total_rx_packets(), 12.0);
}

#[tokio::test]
async fn test_table_never_decreases() {
    let script = vec![
        StepOutcome::new(vec![5200.0], 9.0, false),
        StepOutcome::new(vec![5200.0], 2.0, false),
        StepOutcome::new(vec![5200.0], 11.0, false),
        StepOutcome::new(vec![5200.0], 0.0, true),
    ];
    let mut env = ScriptedEnv::new(vec![5200.0], script).with_fixed_action(Action(8));
    let mut controller = LearningController::new(&config(1.0)).unwrap();

    controller
        .run(&mut env, 2, std::future::pending())
        .await
        .unwrap();

    assert_eq!(controller.table().get(5, Action(8)).unwrap(), 11.0);
    let row = controller.table().row(5).unwrap();
    assert!(row
        .iter()
        .enumerate()
        .all(|(a, v)| a == 8 || *v == 0.0));
}

#[tokio::test]
async fn test_exploitation_follows_table() {
    let script = vec![
        StepOutcome::new(vec![3300.0], 5.0, false),
        StepOutcome::new(vec![3300.0], 1.0, false),
        StepOutcome::new(vec![3300.0], 1.0, true),
    ];
    let mut env = ScriptedEnv::new(vec![3300.0], script);
    let mut controller = LearningController::new(&config(0.0)).unwrap();

    controller
        .run(&mut env, 1, std::future::pending())
        .await
        .unwrap();

    // Zero table: first maximum is action 0, and it stays the best
    assert!(env.actions.iter().all(|a| *a == Action(0)));
    assert_eq!(controller.table().get(3, Action(0)).unwrap(), 5.0);
}

#[tokio::test]
async fn test_exploration_rate_matches_epsilon() {
    let mut env = ScriptedEnv::constant(4500.0, 5000);
    let mut controller =
        LearningController::with_rng(&config(0.8), StdRng::seed_from_u64(99)).unwrap();

    let summary = controller
        .run(&mut env, 1, std::future::pending())
        .await
        .unwrap();

    let rate = summary.episodes[0].exploration_rate();
    assert!((0.77..=0.83).contains(&rate), "exploration rate {rate}");
}

#[tokio::test]
async fn test_interrupt_closes_environment_once() {
    let mut env = ScriptedEnv::constant(2500.0, 10);
    let interrupt = env.interrupt_after(2);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let summary = controller.run(&mut env, 3, interrupt).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.completed_episodes(), 0);
    assert_eq!(env.total_steps, 2);
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_interrupt_between_episodes() {
    let mut env = ScriptedEnv::constant(2500.0, 3);
    let interrupt = env.interrupt_after(3);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let summary = controller.run(&mut env, 5, interrupt).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.completed_episodes(), 1);
    assert_eq!(env.resets, 1);
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_interrupt_before_start() {
    let mut env = ScriptedEnv::constant(2500.0, 3);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let summary = controller.run(&mut env, 2, async {}).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(env.resets, 0);
    assert_eq!(env.total_steps, 0);
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_environment_failure_propagates_and_closes() {
    let mut env = ScriptedEnv::constant(2500.0, 10);
    env.fail_at_step = Some(4);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let err = controller
        .run(&mut env, 2, std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(err, CwTuneError::Connection(_)));
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_out_of_range_bucket_fails_fast() {
    let mut env = ScriptedEnv::constant(12_000.0, 3);
    let mut controller = LearningController::new(&config(0.8)).unwrap();

    let err = controller
        .run(&mut env, 1, std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CwTuneError::BucketOutOfRange { bucket: 12, buckets: 10 }
    ));
    assert_eq!(env.total_steps, 0);
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_out_of_range_bucket_clamped() {
    let mut env = ScriptedEnv::constant(12_000.0, 3).with_fixed_action(Action(12));
    let mut controller = LearningController::new(&LearnerConfig {
        out_of_range: OutOfRange::Clamp,
        ..config(1.0)
    })
    .unwrap();

    controller
        .run(&mut env, 1, std::future::pending())
        .await
        .unwrap();

    assert_eq!(controller.table().get(9, Action(12)).unwrap(), 3.0);
}

#[tokio::test]
async fn test_action_outside_table_is_an_error() {
    let mut env = ScriptedEnv::constant(2500.0, 3).with_fixed_action(Action(13));
    let mut controller = LearningController::new(&config(1.0)).unwrap();

    let err = controller
        .run(&mut env, 1, std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CwTuneError::ActionOutOfRange { action: 13, actions: 13 }
    ));
    assert_eq!(env.closes, 1);
}

#[tokio::test]
async fn test_table_persists_across_episodes() {
    let mut env = ScriptedEnv::constant(6100.0, 2).with_fixed_action(Action(10));
    let mut controller = LearningController::new(&config(1.0)).unwrap();

    controller
        .run(&mut env, 4, std::future::pending())
        .await
        .unwrap();

    assert_eq!(controller.table().get(6, Action(10)).unwrap(), 2.0);
    assert_eq!(controller.total_steps(), 8);
    assert_eq!(controller.episode(), 3);
}

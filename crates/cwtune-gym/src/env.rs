//! Environment trait

use async_trait::async_trait;

use cwtune_core::{Action, Observation, Result, Space, StepOutcome};

/// A simulated environment the learning loop can drive.
///
/// `reset` and `step` are request/response calls to an external process and
/// are the only places the loop waits.
#[async_trait]
pub trait Environment: Send {
    /// Shape of the observations returned by `reset` and `step`
    fn observation_space(&self) -> &Space;

    /// Range of actions accepted by `step`
    fn action_space(&self) -> &Space;

    /// Begin a new episode and return its initial observation
    async fn reset(&mut self) -> Result<Observation>;

    /// Advance the simulation by one control interval
    async fn step(&mut self, action: Action) -> Result<StepOutcome>;

    /// Draw a uniformly random valid action
    fn sample_action(&mut self) -> Result<Action>;

    /// Release the connection and any resources held for the simulator
    async fn close(&mut self) -> Result<()>;
}

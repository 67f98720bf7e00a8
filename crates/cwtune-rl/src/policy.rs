//! Epsilon-greedy action selection

use rand::Rng;
use serde::Serialize;

use cwtune_core::{Action, CwTuneError, Result};
use cwtune_gym::Environment;

use crate::table::ValueTable;

/// Default exploration rate
pub const DEFAULT_EPSILON: f64 = 0.8;

/// Where a selected action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// Sampled from the environment's action space
    Explore,
    /// Argmax of the current bucket's table row
    Exploit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub action: Action,
    pub choice: Choice,
}

/// Explore with probability `epsilon`, otherwise exploit the table
#[derive(Debug, Clone, Copy)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(CwTuneError::Config(format!(
                "epsilon must be within [0, 1], got {epsilon}"
            )));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Draw `u` in [0, 1) and explore when `u < epsilon`
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.gen::<f64>() < self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    pub fn select<R, E>(
        &self,
        rng: &mut R,
        table: &ValueTable,
        bucket: usize,
        env: &mut E,
    ) -> Result<Selection>
    where
        R: Rng + ?Sized,
        E: Environment + ?Sized,
    {
        let choice = self.choose(rng);
        let action = match choice {
            Choice::Explore => env.sample_action()?,
            Choice::Exploit => table.best_action(bucket)?,
        };
        Ok(Selection { action, choice })
    }
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

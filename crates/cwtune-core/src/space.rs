//! Observation and action space descriptors

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CwTuneError, Result};
use crate::types::Action;

/// Element type of a box space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Uint32,
    Int32,
    Float32,
    Float64,
}

impl Dtype {
    pub fn is_integer(self) -> bool {
        matches!(self, Dtype::Uint32 | Dtype::Int32)
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dtype::Uint32 => "uint32",
            Dtype::Int32 => "int32",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
        };
        write!(f, "{name}")
    }
}

/// Shape and bounds of what the simulator reports or accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Space {
    /// Bounded n-dimensional box, bounds shared by every component
    Box {
        low: f64,
        high: f64,
        shape: Vec<usize>,
        dtype: Dtype,
    },

    /// Integers `0..n`
    Discrete { n: u32 },
}

impl Space {
    /// Contention-window box used by the LoRa scenario: one value in 7..=12
    pub fn contention_window() -> Self {
        Space::Box {
            low: 7.0,
            high: 12.0,
            shape: vec![1],
            dtype: Dtype::Uint32,
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            Space::Box { dtype, .. } => *dtype,
            Space::Discrete { .. } => Dtype::Int32,
        }
    }

    /// Number of scalar components
    pub fn width(&self) -> usize {
        match self {
            Space::Box { shape, .. } => shape.iter().product(),
            Space::Discrete { .. } => 1,
        }
    }

    /// Inclusive integer range an action may take
    pub fn action_bounds(&self) -> Result<(u32, u32)> {
        match self {
            Space::Discrete { n } => {
                if *n == 0 {
                    return Err(CwTuneError::Space("Discrete space is empty".to_string()));
                }
                Ok((0, n - 1))
            }
            Space::Box {
                low, high, dtype, ..
            } => {
                if !dtype.is_integer() {
                    return Err(CwTuneError::Space(format!(
                        "Cannot draw integer actions from a {dtype} box"
                    )));
                }
                let low = low.ceil().max(0.0);
                let high = high.floor();
                if high < low {
                    return Err(CwTuneError::Space(format!(
                        "Box space [{low}, {high}] holds no non-negative integer"
                    )));
                }
                Ok((low as u32, high as u32))
            }
        }
    }

    /// Draw a uniformly random valid action
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Action> {
        let (low, high) = self.action_bounds()?;
        Ok(Action(rng.gen_range(low..=high)))
    }

    pub fn contains(&self, action: Action) -> bool {
        self.action_bounds()
            .map(|(low, high)| (low..=high).contains(&action.0))
            .unwrap_or(false)
    }

    /// Repeat a scalar action across every component of the space
    pub fn broadcast(&self, action: Action) -> Vec<u32> {
        vec![action.0; self.width()]
    }
}

impl std::fmt::Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Space::Box {
                low,
                high,
                shape,
                dtype,
            } => {
                let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
                let trailing = if shape.len() == 1 { "," } else { "" };
                write!(
                    f,
                    "Box({low:.1}, {high:.1}, ({}{trailing}), {dtype})",
                    dims.join(", ")
                )
            }
            Space::Discrete { n } => write!(f, "Discrete({n})"),
        }
    }
}

//! Value table: best observed reward per (state bucket, action)

use ndarray::Array2;
use serde::Serialize;

use cwtune_core::{Action, CwTuneError, Result, Reward};

/// Rows of the default table (state levels 0..=9)
pub const DEFAULT_BUCKETS: usize = 10;

/// Columns of the default table (actions 0..=12)
pub const DEFAULT_ACTIONS: usize = 13;

/// Dense (bucket, action) table of best rewards
#[derive(Debug, Clone)]
pub struct ValueTable {
    values: Array2<f64>,
}

impl ValueTable {
    /// All-zero table with the given shape
    pub fn new(buckets: usize, actions: usize) -> Self {
        Self {
            values: Array2::zeros((buckets, actions)),
        }
    }

    pub fn buckets(&self) -> usize {
        self.values.nrows()
    }

    pub fn actions(&self) -> usize {
        self.values.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.buckets(), self.actions())
    }

    fn check(&self, bucket: usize, action: Action) -> Result<()> {
        if bucket >= self.buckets() {
            return Err(CwTuneError::BucketOutOfRange {
                bucket: bucket as i64,
                buckets: self.buckets(),
            });
        }
        if action.index() >= self.actions() {
            return Err(CwTuneError::ActionOutOfRange {
                action: action.index(),
                actions: self.actions(),
            });
        }
        Ok(())
    }

    pub fn get(&self, bucket: usize, action: Action) -> Result<f64> {
        self.check(bucket, action)?;
        Ok(self.values[[bucket, action.index()]])
    }

    /// Keep the larger of the stored value and `reward`; returns the stored value
    pub fn update_max(&mut self, bucket: usize, action: Action, reward: Reward) -> Result<f64> {
        self.check(bucket, action)?;
        let cell = &mut self.values[[bucket, action.index()]];
        if reward > *cell {
            *cell = reward;
        }
        Ok(*cell)
    }

    /// Action with the largest value in a row; the lowest index wins ties
    pub fn best_action(&self, bucket: usize) -> Result<Action> {
        if bucket >= self.buckets() {
            return Err(CwTuneError::BucketOutOfRange {
                bucket: bucket as i64,
                buckets: self.buckets(),
            });
        }

        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (index, value) in self.values.row(bucket).iter().enumerate() {
            if *value > best_value {
                best = index;
                best_value = *value;
            }
        }
        Ok(Action::from_index(best))
    }

    pub fn row(&self, bucket: usize) -> Option<Vec<f64>> {
        (bucket < self.buckets()).then(|| self.values.row(bucket).to_vec())
    }

    /// Every row, bucket order
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values.rows().into_iter().map(|row| row.to_vec()).collect()
    }

    /// Best action and value for every bucket that has seen a positive reward
    pub fn policy(&self) -> Vec<BucketPolicy> {
        (0..self.buckets())
            .filter_map(|bucket| {
                let action = self.best_action(bucket).ok()?;
                let value = self.values[[bucket, action.index()]];
                (value > 0.0).then_some(BucketPolicy {
                    bucket,
                    action,
                    value,
                })
            })
            .collect()
    }
}

impl Default for ValueTable {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS, DEFAULT_ACTIONS)
    }
}

impl std::fmt::Display for ValueTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (bucket, row) in self.values.rows().into_iter().enumerate() {
            write!(f, "{bucket:>2} |")?;
            for value in row {
                write!(f, " {value:>7.1}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Learned choice for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketPolicy {
    pub bucket: usize,
    pub action: Action,
    pub value: f64,
}

//! Observation discretization

use serde::Deserialize;

use cwtune_core::{CwTuneError, Observation, Result};

/// Width of one state level in observation units
pub const DEFAULT_BUCKET_WIDTH: f64 = 1000.0;

/// What to do with a level that falls outside the value table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRange {
    /// Return `BucketOutOfRange`
    #[default]
    Fail,
    /// Clamp into the first or last bucket
    Clamp,
}

/// Maps an observation to a state bucket: `floor(mean / width)`
#[derive(Debug, Clone, Copy)]
pub struct Discretizer {
    width: f64,
    buckets: usize,
    out_of_range: OutOfRange,
}

impl Discretizer {
    pub fn new(width: f64, buckets: usize, out_of_range: OutOfRange) -> Result<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(CwTuneError::Config(format!(
                "bucket width must be positive, got {width}"
            )));
        }
        if buckets == 0 {
            return Err(CwTuneError::Config("bucket count must be positive".to_string()));
        }
        Ok(Self {
            width,
            buckets,
            out_of_range,
        })
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Unbounded level of an observation
    pub fn level(&self, observation: &Observation) -> Result<i64> {
        let mean = observation
            .mean()
            .ok_or_else(|| CwTuneError::InvalidObservation("empty observation".to_string()))?;
        if !mean.is_finite() {
            return Err(CwTuneError::InvalidObservation(format!(
                "observation mean is {mean}"
            )));
        }
        Ok((mean / self.width).floor() as i64)
    }

    /// Level checked against the table's bucket range
    pub fn bucket(&self, observation: &Observation) -> Result<usize> {
        let level = self.level(observation)?;
        let last = self.buckets as i64 - 1;

        if (0..=last).contains(&level) {
            return Ok(level as usize);
        }

        match self.out_of_range {
            OutOfRange::Fail => Err(CwTuneError::BucketOutOfRange {
                bucket: level,
                buckets: self.buckets,
            }),
            OutOfRange::Clamp => Ok(level.clamp(0, last) as usize),
        }
    }
}

impl Default for Discretizer {
    fn default() -> Self {
        Self {
            width: DEFAULT_BUCKET_WIDTH,
            buckets: crate::table::DEFAULT_BUCKETS,
            out_of_range: OutOfRange::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(values: &[f64]) -> Observation {
        Observation::new(values.to_vec())
    }

    #[test]
    fn test_mean_4500_is_bucket_4() {
        let discretizer = Discretizer::default();
        assert_eq!(discretizer.bucket(&obs(&[4500.0])).unwrap(), 4);
        assert_eq!(discretizer.bucket(&obs(&[4000.0, 5000.0])).unwrap(), 4);
    }

    #[test]
    fn test_same_mean_same_bucket() {
        let discretizer = Discretizer::default();
        let samples = [
            obs(&[3200.0]),
            obs(&[3000.0, 3400.0]),
            obs(&[0.0, 6400.0, 3200.0]),
            obs(&[3200.0, 3200.0, 3200.0, 3200.0]),
        ];

        for sample in &samples {
            assert_eq!(discretizer.bucket(sample).unwrap(), 3);
        }
    }

    #[test]
    fn test_bucket_edges() {
        let discretizer = Discretizer::default();
        assert_eq!(discretizer.bucket(&obs(&[0.0])).unwrap(), 0);
        assert_eq!(discretizer.bucket(&obs(&[999.9])).unwrap(), 0);
        assert_eq!(discretizer.bucket(&obs(&[1000.0])).unwrap(), 1);
        assert_eq!(discretizer.bucket(&obs(&[9999.0])).unwrap(), 9);
    }

    #[test]
    fn test_out_of_range_fails_by_default() {
        let discretizer = Discretizer::default();

        assert!(matches!(
            discretizer.bucket(&obs(&[10_000.0])),
            Err(CwTuneError::BucketOutOfRange { bucket: 10, buckets: 10 })
        ));
        assert!(matches!(
            discretizer.bucket(&obs(&[-1.0])),
            Err(CwTuneError::BucketOutOfRange { bucket: -1, .. })
        ));
    }

    #[test]
    fn test_out_of_range_clamp() {
        let discretizer = Discretizer::new(1000.0, 10, OutOfRange::Clamp).unwrap();

        assert_eq!(discretizer.bucket(&obs(&[25_000.0])).unwrap(), 9);
        assert_eq!(discretizer.bucket(&obs(&[-300.0])).unwrap(), 0);
        assert_eq!(discretizer.level(&obs(&[25_000.0])).unwrap(), 25);
    }

    #[test]
    fn test_invalid_observations() {
        let discretizer = Discretizer::new(1000.0, 10, OutOfRange::Clamp).unwrap();

        assert!(matches!(
            discretizer.bucket(&Observation::default()),
            Err(CwTuneError::InvalidObservation(_))
        ));
        assert!(matches!(
            discretizer.bucket(&obs(&[f64::NAN])),
            Err(CwTuneError::InvalidObservation(_))
        ));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(Discretizer::new(0.0, 10, OutOfRange::Fail).is_err());
        assert!(Discretizer::new(1000.0, 0, OutOfRange::Fail).is_err());
    }
}

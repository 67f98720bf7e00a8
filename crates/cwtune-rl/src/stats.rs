//! Episode and run statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::table::BucketPolicy;

/// Counters of one finished episode
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeStats {
    pub episode: u32,
    pub steps: u64,
    /// Sum of rewards accumulated before each step (received packets)
    pub rx_packets: f64,
    pub explored: u64,
    pub exploited: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl EpisodeStats {
    pub fn exploration_rate(&self) -> f64 {
        if self.steps > 0 {
            self.explored as f64 / self.steps as f64
        } else {
            0.0
        }
    }

    /// Average of the accumulated per-step rewards
    pub fn mean_reward(&self) -> f64 {
        if self.steps > 0 {
            self.rx_packets / self.steps as f64
        } else {
            0.0
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub episodes: Vec<EpisodeStats>,
    pub interrupted: bool,
    pub total_steps: u64,
    pub policy: Vec<BucketPolicy>,
}

impl RunSummary {
    pub fn completed_episodes(&self) -> usize {
        self.episodes.len()
    }

    pub fn total_rx_packets(&self) -> f64 {
        self.episodes.iter().map(|e| e.rx_packets).sum()
    }
}

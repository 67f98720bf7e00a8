//! cwtune RL - Contention-window learning loop
//!
//! This crate provides the value table, observation discretization, the
//! epsilon-greedy policy and the controller that drives a simulation
//! environment episode by episode.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]

pub mod controller;
pub mod discretize;
pub mod policy;
pub mod stats;
pub mod table;

pub use controller::{LearnerConfig, LearningController};
pub use discretize::{Discretizer, OutOfRange};
pub use policy::{Choice, EpsilonGreedy, Selection};
pub use stats::{EpisodeStats, RunSummary};
pub use table::{BucketPolicy, ValueTable};

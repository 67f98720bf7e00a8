//! cwtune Core - Core types and shared functionality
//!
//! This crate provides the foundational types used across all cwtune components:
//! observations and actions exchanged with the simulator, space descriptors,
//! the bridge message envelope and the shared error type.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod bridge;
pub mod error;
pub mod space;
pub mod types;
pub mod util;

pub use bridge::{BridgeError, BridgeMessage};
pub use error::{CwTuneError, Result};
pub use space::{Dtype, Space};
pub use types::*;

//! cwtune Gym - Simulation environment interface
//!
//! This crate defines the [`Environment`] capability consumed by the learning
//! loop and the simulator binding that implements it over the WebSocket bridge.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod env;
pub mod launcher;
pub mod ns3;
pub mod server;

pub use client::BridgeClient;
pub use env::Environment;
pub use launcher::SimProcess;
pub use ns3::{Ns3Env, Ns3EnvConfig};
pub use server::{BridgeServer, SimulatorHandler};

// Re-export core bridge types
pub use cwtune_core::bridge::{methods, ResetResponse, SpacesResponse, StepParams};
pub use cwtune_core::{BridgeError, BridgeMessage};

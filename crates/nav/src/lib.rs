//! Agent steering: a small feed-forward network proposes a step, and a
//! deterministic overlay keeps agents out of walls and over hurdles.
//!
//! # Invariants
//! - Inference is a pure function of the network, the path query and the
//!   27-cell neighborhood. No per-tick state is kept.
//! - Within [`GOAL_RADIUS`] of the destination the output is exactly zero.
//! - Output is unit length or zero, never NaN.
//! - Weights round-trip bit-exactly through [`Network::serialize`].
//!
//! Training lives behind the `training` feature so inference-only builds do
//! not link it.

mod network;
mod path;
mod steer;
#[cfg(feature = "training")]
pub mod training;

pub use network::{INPUTS, Network, OUTPUTS, PARAM_COUNT};
pub use path::PathQuery;
pub use steer::{GOAL_RADIUS, NavController, STEP_SIZE, decode_output, encode_input, overlay, propose, steer};

/// Errors from loading or constructing networks.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("weight blob is {actual} bytes, expected {expected}")]
    WeightLength { expected: usize, actual: usize },
    #[error("network needs {expected} parameters, got {actual}")]
    ParamCount { expected: usize, actual: usize },
    #[error("weight file: {0}")]
    Io(#[from] std::io::Error),
}

//! Developer tooling: read-only inspection of a running simulation and of
//! steering weights.
//!
//! # Invariants
//! - Inspectors never mutate what they inspect.

mod inspector;

pub use inspector::{AgentInfo, SimSummary, SimulationInspector, WeightsSummary};

//! Collaborator interfaces: where the simulation hands off chunk geometry
//! and cosmetic notifications.
//!
//! # Invariants
//! - Sinks only read what they are given; they never reach back into the grid.
//! - Geometry is uploaded after a terrain edit or a view-window change, not every frame.
//!
//! GPU backends live outside this workspace. [`DebugRecorder`] implements
//! both traits and keeps a text log, for the CLI and for tests.

mod recorder;
mod sink;

pub use recorder::{DebugRecorder, Destruction};
pub use sink::{EffectSink, GeometrySink, NullSink};

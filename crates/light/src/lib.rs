//! Light propagation for freshly generated levels.
//!
//! Two independent phases run in order over one level:
//! 1. sky pass: per column, from the height map and block opacity only;
//! 2. block pass: breadth-first flood fill from the level's light sources.
//!
//! # Invariants
//! - A neighbour is enqueued only when its value strictly increases, so the
//!   flood fill terminates and repeated runs converge to the same field.
//! - A level's provider lock is held for a whole run; lighting is never
//!   observed half done.

mod engine;
mod propagate;
mod sky;

pub use engine::{LightEngine, LightError, LightStats, PhaseTimings};
pub use propagate::{BlockPassStats, block_pass};
pub use sky::{column_sky_light, sky_pass};

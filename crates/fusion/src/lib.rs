//! # Fusion
//!
//! Obstacle belief fusion and the shared rover state it lives in.
//!
//! The sensor listener and the operator server write into [`SharedState`]
//! from their own tasks; the control loop reads one consistent
//! [`ObstacleBelief`](contracts::ObstacleBelief) per tick.

mod belief;
mod state;

pub use belief::ObstacleFusion;
pub use state::SharedState;

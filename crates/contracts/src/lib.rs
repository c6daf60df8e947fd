//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Conventions
//! - Image x grows to the right, y grows downward
//! - Angles are degrees; positive steer turns the rover right
//! - Obstacle distance is centimeters, speed is cm/s, traveled distance is meters
//! - Timestamps are monotonic `Instant`s; wall-clock time only appears in telemetry

mod blueprint;
mod control;
mod error;
mod frame;
mod lane;
mod obstacle;
mod operator;
mod sink;

pub use blueprint::*;
pub use control::*;
pub use error::*;
pub use frame::{Frame, FrameSource, FrameSourceKind};
pub use lane::*;
pub use obstacle::*;
pub use operator::*;
pub use sink::*;

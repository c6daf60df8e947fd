//! # Control
//!
//! Turns one tick's lane result and obstacle belief into an actuator
//! command, and integrates traveled distance.

mod odometry;
mod pid;
mod policy;
mod speed;

pub use odometry::{effective_speed, Odometer};
pub use pid::{Pid, MIN_DT_SECS};
pub use policy::{away_from, ControlPolicy};
pub use speed::speed_for_steer;

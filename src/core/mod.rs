//! Services and collaborator seams wrapped around the pure household computations.

pub mod services;
pub mod time;

pub use time::{Clock, FixedClock, SystemClock};

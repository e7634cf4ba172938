//! Demo collector that needs no CI server.
//!
//! - [`RotatingCollector`]: cycles configured jobs through health states

mod collector;

pub use collector::{RotatingCollector, RotatingConfig};

//! Foundation utilities: math, logging and loop pacing

pub mod logging;
pub mod math;
pub mod time;

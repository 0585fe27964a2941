//! Utility Module
//!
//! - [`time`]: Wall-clock date decomposition and elapsed-time helpers used by
//!   the procedural standard inputs.

pub mod time;

pub use time::CivilDate;

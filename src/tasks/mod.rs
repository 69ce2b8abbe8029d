//! Background Tasks Module
//!
//! Contains background tasks owned by store instances.
//!
//! # Tasks
//! - Sweep: removes expired in-process entries at the configured interval

mod sweep;

pub use sweep::spawn_sweep_task;

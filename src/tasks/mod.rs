//! Background Tasks Module
//!
//! Contains the blocking work the harness offloads from the async runtime.
//!
//! # Tasks
//! - Trace replay: feeds a parsed trace into one cache instance

mod replay;

pub use replay::{replay, run_experiment, spawn_replay_task};

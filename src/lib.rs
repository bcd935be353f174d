//! Local-first punch clock for tracking daily attendance.
//! Records live in a single json file on the machine, so the tool works without
//! any server and can be inspected or backed up with ordinary file tools.
//!

pub mod attendance;
pub mod cli;
pub mod fs;
pub mod store;
pub mod utils;

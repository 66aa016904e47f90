//! mtframework-rs library
//!
//! Command implementations and the format registry behind the
//! `mtframework-rs` binary.

pub mod cli;
pub mod commands;
pub mod registry;
pub mod utils;

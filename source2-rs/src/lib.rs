//! Source2-RS library
//!
//! Command definitions for inspecting Source 2 animation resources.

pub mod cli;
pub mod commands;

//! Root CLI structure for source2-rs

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "source2-rs")]
#[command(about = "Command-line tools for Source 2 animation resources", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Animation clip operations
    Anim {
        #[command(subcommand)]
        command: crate::commands::anim::AnimCommands,
    },
}

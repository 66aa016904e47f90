//! Root CLI structure for mtframework-rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mtframework-rs")]
#[command(about = "Command-line tools for MT Framework asset formats", long_about = None)]
#[command(version)]
#[command(author)]
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
    /// ARC archive operations
    Arc {
        #[command(subcommand)]
        command: crate::commands::arc::ArcCommands,
    },

    /// TEX texture operations
    Tex {
        #[command(subcommand)]
        command: crate::commands::tex::TexCommands,
    },

    /// MOD model operations
    Mod {
        #[command(subcommand)]
        command: crate::commands::model::ModCommands,
    },

    /// LMT animation operations
    Lmt {
        #[command(subcommand)]
        command: crate::commands::lmt::LmtCommands,
    },

    /// SBC collision operations
    Sbc {
        #[command(subcommand)]
        command: crate::commands::sbc::SbcCommands,
    },

    /// Identify a file by its magic and summarise it
    Info {
        /// Path to any supported file
        file: PathBuf,
    },

    /// Convert a file to its counterpart format (TEX to DDS, DDS to TEX)
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file (defaults to the input with the target extension)
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

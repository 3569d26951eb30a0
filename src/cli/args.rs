//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Unravel shrunk neuronal morphologies while preserving segment lengths
#[derive(Parser, Debug)]
#[command(name = "unravel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Unravel a single morphology
    File {
        /// Input morphology
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output morphology
        #[arg(value_hint = ValueHint::FilePath)]
        output: PathBuf,
        /// Segments on each side used to estimate a segment's direction
        #[arg(short, long)]
        window_half_length: Option<usize>,
    },

    /// Unravel every morphology of a directory
    Dir {
        /// Directory with input morphologies
        #[arg(value_hint = ValueHint::DirPath)]
        input_dir: PathBuf,
        /// Directory for the unravelled morphologies (created if missing)
        #[arg(value_hint = ValueHint::DirPath)]
        output_dir: PathBuf,
        /// Segments on each side used to estimate a segment's direction
        #[arg(short, long)]
        window_half_length: Option<usize>,
        /// Process one file at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Show the section tree of a morphology
    Info {
        /// Morphology file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show global config path
    Path,

    /// Create global config template
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

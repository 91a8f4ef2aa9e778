//! # CLI Structure and Argument Parsing
//!
//! ```bash
//! # Inspect how a note is chunked
//! notechunk chunk notes/rust.md --original-id 20240101120000
//!
//! # Preview what a sync would change against a saved baseline
//! notechunk diff notes/rust.md --original-id 20240101120000 --baseline baseline.json
//!
//! # Sync into a local JSON-backed store
//! notechunk sync notes/rust.md --original-id 20240101120000 --store index.json
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Main CLI structure for the `notechunk` command
#[derive(Parser, Clone, Debug)]
#[command(name = "notechunk")]
#[command(version)]
#[command(about = "notechunk - Structure-aware chunking and incremental sync for markdown notes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "NOTECHUNK_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// The note a command operates on.
#[derive(Args, Clone, Debug)]
pub struct NoteArgs {
    /// Markdown file to read
    pub file: PathBuf,

    /// Stable document identity that scopes chunk ids in the store
    #[arg(long, value_name = "ID")]
    pub original_id: String,

    /// Structural cache (JSON) supplied by an editor instead of parsing the file
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Tags to attach to every chunk (repeatable); defaults to frontmatter tags
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Override the soft cap on chunks per note
    #[arg(long, value_name = "N")]
    pub max_chunks: Option<usize>,
}

/// Subcommands.
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Chunk a note and print the chunks
    Chunk {
        #[command(flatten)]
        note: NoteArgs,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Classify a note's chunks against a stored baseline without writing anything
    Diff {
        #[command(flatten)]
        note: NoteArgs,

        /// Baseline entries (JSON array of `{chunkId, storedContentHash, storeRecordId}`)
        #[arg(long, value_name = "PATH")]
        baseline: PathBuf,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Sync a note into a JSON-file vector store
    Sync {
        #[command(flatten)]
        note: NoteArgs,

        /// Store snapshot file; created when missing
        #[arg(long, value_name = "PATH")]
        store: PathBuf,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove every record of a document from a JSON-file vector store
    Purge {
        /// Document identity to remove
        #[arg(long, value_name = "ID")]
        original_id: String,

        /// Store snapshot file
        #[arg(long, value_name = "PATH")]
        store: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Print the default configuration file path instead
        #[arg(long)]
        path: bool,
    },
}

impl Commands {
    /// Output format of the command, for commands that have one.
    pub const fn format(&self) -> Option<OutputFormat> {
        match self {
            Self::Chunk { format, .. } | Self::Diff { format, .. } | Self::Sync { format, .. } => {
                Some(*format)
            },
            Self::Purge { .. } | Self::Config { .. } => None,
        }
    }
}

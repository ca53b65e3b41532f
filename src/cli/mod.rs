//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ingest text documents and answer questions about them.
#[derive(Debug, Parser)]
#[command(name = "docrag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "DOCRAG_CONFIG",
        help = "Path to the config file"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        short = 'f',
        global = true,
        default_value_t = OutputFormat::Text,
        help = "Output format: text or json"
    )]
    pub format: OutputFormat,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the pgvector extension and tables
    Init,

    /// Ingest files, a directory or stdin
    Ingest(commands::IngestArgs),

    /// Embed every chunk that has no embedding yet
    Embed(commands::EmbedArgs),

    /// Manage ingested documents
    #[command(subcommand)]
    Documents(commands::DocumentsCommand),

    /// List the chunks of a document
    Chunks(commands::ChunksArgs),

    /// Find the chunks of a document nearest to a query
    Search(commands::SearchArgs),

    /// Answer a question from a document's chunks
    Ask(commands::AskArgs),

    /// Serve the HTTP API
    Serve(commands::ServeArgs),

    /// Check store and provider status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

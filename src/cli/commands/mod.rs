mod config;
mod documents;
mod ingest;
mod search;
mod serve;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::models::{Config, OutputFormat};

pub use config::ConfigCommand;
pub use documents::DocumentsCommand;
pub use ingest::{EmbedArgs, IngestArgs};
pub use search::{AskArgs, ChunksArgs, SearchArgs};
pub use serve::ServeArgs;

pub use config::handle_config;
pub use documents::{handle_documents, handle_init};
pub use ingest::{handle_embed, handle_ingest};
pub use search::{handle_ask, handle_chunks, handle_search};
pub use serve::handle_serve;
pub use status::handle_status;

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: Option<PathBuf>,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl CommandContext {
    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config_path.as_deref()).context("failed to load configuration")
    }
}

use anyhow::{Context, Result};
use clap::Subcommand;

use super::CommandContext;
use crate::cli::output::get_formatter;
use crate::services::create_backend;

#[derive(Debug, Subcommand)]
pub enum DocumentsCommand {
    /// List ingested documents
    List,

    /// Delete a document and its chunks
    Delete {
        /// Document id
        id: i64,
    },
}

pub async fn handle_init(ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let formatter = get_formatter(ctx.format);

    let store = create_backend(&config).await?;
    store
        .initialize()
        .await
        .context("failed to initialize schema")?;

    println!(
        "{}",
        formatter.format_message(&format!(
            "Schema ready ({}, {} dimensions)",
            store.driver(),
            config.embedding.dimension
        ))
    );
    Ok(())
}

pub async fn handle_documents(cmd: DocumentsCommand, ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let formatter = get_formatter(ctx.format);
    let store = create_backend(&config).await?;

    match cmd {
        DocumentsCommand::List => {
            let documents = store
                .list_documents()
                .await
                .context("failed to list documents")?;
            print!("{}", formatter.format_documents(&documents));
        }
        DocumentsCommand::Delete { id } => {
            let deleted = store
                .delete_document(id)
                .await
                .context("failed to delete document")?;

            if !deleted {
                anyhow::bail!("document {id} not found");
            }
            println!(
                "{}",
                formatter.format_message(&format!("Deleted document {id} and its chunks"))
            );
        }
    }

    Ok(())
}

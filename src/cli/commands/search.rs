use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use super::CommandContext;
use crate::cli::output::get_formatter;
use crate::services::{RagService, create_backend};

#[derive(Debug, Args)]
pub struct ChunksArgs {
    #[arg(required = true, help = "Document id")]
    pub document_id: i64,

    #[arg(long, short = 'q', help = "Only chunks containing this text (case-insensitive)")]
    pub filter: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Document id")]
    pub document_id: i64,

    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'k', help = "Number of chunks to return")]
    pub k: Option<usize>,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Document id")]
    pub document_id: i64,

    #[arg(required = true, help = "Question to answer from the document")]
    pub question: String,

    #[arg(long, short = 'k', help = "Number of chunks to use as context")]
    pub k: Option<usize>,
}

pub async fn handle_chunks(args: ChunksArgs, ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let formatter = get_formatter(ctx.format);

    let store = create_backend(&config).await?;
    let chunks = store
        .list_chunks(args.document_id, args.filter.as_deref())
        .await
        .context("failed to list chunks")?;

    print!(
        "{}",
        formatter.format_chunks(args.document_id, args.filter.as_deref(), &chunks)
    );
    Ok(())
}

pub async fn handle_search(args: SearchArgs, ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let formatter = get_formatter(ctx.format);
    let service = RagService::from_config(&config).await?;

    let query = args.query.trim();
    let k = args.k.unwrap_or(service.default_k());

    if ctx.verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Document: {}", args.document_id);
        eprintln!("  k: {k}");
    }

    let start = Instant::now();
    let results = service
        .retriever()
        .retrieve(args.document_id, query, k)
        .await
        .context("search failed")?;

    if ctx.verbose {
        eprintln!("Total: {}ms", start.elapsed().as_millis());
        eprintln!();
    }

    print!(
        "{}",
        formatter.format_search(args.document_id, query, k, &results)
    );
    Ok(())
}

pub async fn handle_ask(args: AskArgs, ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let formatter = get_formatter(ctx.format);
    let service = RagService::from_config(&config).await?;

    let k = args.k.unwrap_or(service.default_k());
    let start = Instant::now();

    let answer = service
        .synthesizer()
        .answer(args.document_id, &args.question, k)
        .await
        .context("failed to answer question")?;

    if ctx.verbose {
        eprintln!(
            "Answered from {} source(s) in {}ms",
            answer.sources.len(),
            start.elapsed().as_millis()
        );
        eprintln!();
    }

    print!(
        "{}",
        formatter.format_answer(args.document_id, &args.question, &answer)
    );
    Ok(())
}

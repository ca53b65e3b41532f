use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::CommandContext;
use crate::server::{serve, shutdown_signal};
use crate::services::RagService;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (defaults to `server.bind`)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Ingest and embed a file or directory before serving
    #[arg(long)]
    pub preload: Option<PathBuf>,
}

pub async fn handle_serve(args: ServeArgs, ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let service = RagService::from_config(&config).await?;

    service
        .store()
        .initialize()
        .await
        .context("failed to initialize schema")?;

    if let Some(path) = &args.preload {
        let reports = service
            .ingestor()
            .ingest_path(path, &config.ingest.pattern)
            .await
            .with_context(|| format!("failed to preload {}", path.display()))?;
        let report = service
            .backfill()
            .run(|_| {}, || {})
            .await
            .context("failed to embed preloaded documents")?;

        tracing::info!(
            documents = reports.len(),
            embedded = report.embedded,
            "preloaded {}",
            path.display()
        );
    }

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    serve(service, &bind, shutdown_signal()).await
}

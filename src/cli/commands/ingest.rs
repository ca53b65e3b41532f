use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::CommandContext;
use crate::cli::output::get_formatter;
use crate::models::{NewDocument, OutputFormat};
use crate::services::{Ingestor, RagService, TextChunker, create_backend};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// File or directory to ingest, or `-` to read stdin
    #[arg(required = true)]
    pub path: PathBuf,

    /// File name pattern for directories (defaults to `ingest.pattern`)
    #[arg(long, short = 'p')]
    pub pattern: Option<String>,

    /// Document title when reading stdin
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Document URL when reading stdin
    #[arg(long)]
    pub url: Option<String>,

    /// Embed the new chunks right away
    #[arg(long)]
    pub embed: bool,

    /// Show what would be ingested without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct EmbedArgs {
    /// Override `backfill.concurrency`
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,
}

fn progress_bar(len: u64, template: &str, format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

pub async fn handle_ingest(args: IngestArgs, ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let formatter = get_formatter(ctx.format);
    let start = Instant::now();

    // Embedding needs provider clients; plain ingestion only needs the store.
    let service = if args.embed && !args.dry_run {
        Some(RagService::from_config(&config).await?)
    } else {
        None
    };
    let ingestor = match &service {
        Some(service) => service.ingestor().clone(),
        None => Ingestor::new(
            create_backend(&config).await?,
            TextChunker::from_config(&config.chunking),
            &config.ingest,
        ),
    };

    let reports = if args.path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;

        let title = args.title.unwrap_or_else(|| "stdin".to_string());
        let mut document = NewDocument::new(config.ingest.source.clone(), title);
        if let Some(url) = args.url {
            document = document.with_url(url);
        }

        if args.dry_run {
            let chunks = TextChunker::from_config(&config.chunking).split(&text).len();
            println!(
                "{}",
                formatter.format_message(&format!("Would ingest stdin as {chunks} chunk(s)"))
            );
            return Ok(());
        }
        vec![ingestor.ingest_text(&document, &text).await?]
    } else {
        let pattern = args.pattern.as_deref().unwrap_or(&config.ingest.pattern);
        let files = ingestor.files(&args.path, pattern)?;

        if files.is_empty() {
            println!(
                "{}",
                formatter.format_message(&format!(
                    "No files matching {pattern} under {}",
                    args.path.display()
                ))
            );
            return Ok(());
        }

        if args.dry_run {
            let mut lines = vec![format!("Would ingest {} file(s):", files.len())];
            lines.extend(files.iter().map(|f| format!("  {}", f.display())));
            println!("{}", formatter.format_message(&lines.join("\n")));
            return Ok(());
        }

        let pb = progress_bar(
            files.len() as u64,
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ctx.format,
        );

        let mut reports = Vec::with_capacity(files.len());
        for file in &files {
            pb.set_message(file.display().to_string());
            let report = ingestor
                .ingest_file(file)
                .await
                .with_context(|| format!("failed to ingest {}", file.display()))?;
            reports.push(report);
            pb.inc(1);
        }
        pb.finish_and_clear();
        reports
    };

    tracing::debug!(
        documents = reports.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "ingestion finished"
    );
    print!("{}", formatter.format_ingest(&reports));

    if let Some(service) = service {
        run_backfill(&service, ctx.format).await?;
    }

    Ok(())
}

pub async fn handle_embed(args: EmbedArgs, ctx: &CommandContext) -> Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(concurrency) = args.concurrency {
        config.backfill.concurrency = concurrency.max(1);
    }

    let service = RagService::from_config(&config).await?;
    run_backfill(&service, ctx.format).await
}

async fn run_backfill(service: &RagService, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let pb = progress_bar(
        0,
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} embedded",
        format,
    );

    let report = service
        .backfill()
        .run(
            |pending| pb.set_length(pending as u64),
            || pb.inc(1),
        )
        .await
        .context("embedding backfill failed")?;
    pb.finish_and_clear();

    print!("{}", formatter.format_backfill(&report));
    Ok(())
}

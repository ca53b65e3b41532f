use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docrag::cli::commands::{
    CommandContext, handle_ask, handle_chunks, handle_config, handle_documents, handle_embed,
    handle_ingest, handle_init, handle_search, handle_serve, handle_status,
};
use docrag::cli::{Cli, Commands};
use docrag::server::shutdown_signal;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "docrag=debug,tower_http=debug"
    } else {
        "docrag=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = CommandContext {
        config_path: cli.config,
        format: cli.format,
        verbose: cli.verbose,
    };

    match cli.command {
        // The server drains connections on its own shutdown signal.
        Commands::Serve(args) => handle_serve(args, &ctx).await?,
        command => {
            tokio::select! {
                result = run_command(command, &ctx) => {
                    result?;
                }
                _ = shutdown_signal() => {
                    eprintln!("\nReceived shutdown signal, cleaning up...");
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    Ok(())
}

async fn run_command(command: Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Init => handle_init(ctx).await?,
        Commands::Ingest(args) => handle_ingest(args, ctx).await?,
        Commands::Embed(args) => handle_embed(args, ctx).await?,
        Commands::Documents(cmd) => handle_documents(cmd, ctx).await?,
        Commands::Chunks(args) => handle_chunks(args, ctx).await?,
        Commands::Search(args) => handle_search(args, ctx).await?,
        Commands::Ask(args) => handle_ask(args, ctx).await?,
        Commands::Serve(args) => handle_serve(args, ctx).await?,
        Commands::Status => handle_status(ctx).await?,
        Commands::Config(cmd) => handle_config(cmd, ctx).await?,
    }

    Ok(())
}

use anyhow::Result;

use super::CommandContext;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::StoreDriver;
use crate::services::create_backend;

pub async fn handle_status(ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let formatter = get_formatter(ctx.format);

    let (connected, stats) = match create_backend(&config).await {
        Ok(store) => {
            let connected = store.health_check().await.unwrap_or(false);
            let stats = if connected {
                store.stats().await.ok()
            } else {
                None
            };
            (connected, stats)
        }
        Err(e) => {
            if ctx.verbose {
                eprintln!("Store error: {e:#}");
            }
            (false, None)
        }
    };

    let status = StatusInfo {
        driver: config.database.driver.to_string(),
        connected,
        stats,
        provider_url: config.provider.base_url.clone(),
        api_key_set: config.provider.api_key.is_some(),
        embedding_model: config.embedding.model.clone(),
        embedding_dimension: config.embedding.dimension,
        completion_model: config.completion.model.clone(),
    };

    print!("{}", formatter.format_status(&status));

    if !connected || !status.api_key_set {
        eprintln!();
        if !connected {
            match config.database.driver {
                StoreDriver::PostgreSQL if config.database.url.is_none() => {
                    eprintln!("Hint: set DATABASE_URL or database.url in the config file.");
                }
                StoreDriver::PostgreSQL => {
                    eprintln!("Warning: PostgreSQL not accessible. Check connection settings.");
                }
                StoreDriver::Memory => {}
            }
        }
        if !status.api_key_set {
            eprintln!("Hint: set OPENAI_API_KEY to enable embed, search and ask.");
        }
    }

    Ok(())
}

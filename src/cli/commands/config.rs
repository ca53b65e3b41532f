use anyhow::{Context, Result};
use clap::Subcommand;

use super::CommandContext;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a configuration file with default values")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, ctx: &CommandContext) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, ctx),
        ConfigCommand::Show => handle_show(ctx),
        ConfigCommand::Path => handle_path(ctx),
    }
}

fn handle_init(force: bool, ctx: &CommandContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let config_path = match &ctx.config_path {
        Some(path) => path.clone(),
        None => Config::config_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?,
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default()
        .save(Some(&config_path))
        .context("failed to write config")?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;

    if ctx.format == OutputFormat::Json {
        // `provider.api_key` is never serialized.
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = active_path(ctx) {
        println!("# Config: {}", path.display());
    } else {
        println!("# Config: defaults and environment only");
    }
    println!();
    print!(
        "{}",
        toml::to_string_pretty(&config).context("failed to render config")?
    );

    println!();
    let key = if config.provider.api_key.is_some() {
        "set"
    } else {
        "not set"
    };
    println!("# OPENAI_API_KEY: {key}");
    Ok(())
}

fn handle_path(ctx: &CommandContext) -> Result<()> {
    println!("Configuration paths:");
    println!();

    match active_path(ctx) {
        Some(path) => println!("Config (active): {}", path.display()),
        None => {
            if let Some(path) = ctx.config_path.clone().or_else(Config::config_path) {
                println!("Config (would be): {}", path.display());
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        if env_path.exists() {
            println!(".env file (active): {}", env_path.display());
        } else {
            println!(".env file (would be): {}", env_path.display());
        }
    }

    Ok(())
}

fn active_path(ctx: &CommandContext) -> Option<std::path::PathBuf> {
    ctx.config_path
        .clone()
        .or_else(Config::config_path)
        .filter(|path| path.exists())
}

//! Limit command handlers.

use super::commands::{Cli, Commands, OutputFormat, subscription};
use nimbus::{
    Consumption, JsonError, LimitConfig, LimitStatus, NimbusResult, StorageError,
    StorageErrorKind, open_local, render_consumption, render_status,
};
use std::path::PathBuf;

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> NimbusResult<()> {
    let config = match &cli.config {
        Some(path) => LimitConfig::from_file(path)?,
        None => LimitConfig::load()?,
    };
    let data_dir = resolve_data_dir(cli.data_dir)?;
    let manager = open_local(&data_dir, config, cli.local_clock)?;
    let format = cli.format;

    match cli.command {
        Commands::Check { target } => {
            let status = manager
                .calculate_limit(&target.user, target.kind, target.subscription())
                .await?;
            print_statuses(&[status], format)
        }

        Commands::Consume { target } => {
            let consumption = manager
                .consume(&target.user, target.kind, target.subscription())
                .await?;
            print_consumption(&consumption, format)
        }

        Commands::Status { user, premium } => {
            let statuses = manager.calculate_all(&user, subscription(premium)).await?;
            print_statuses(&statuses, format)
        }

        Commands::Prune { target } => {
            let removed = manager
                .prune(&target.user, target.kind, target.subscription())
                .await?;
            println!("removed {} expired record(s)", removed);
            Ok(())
        }

        Commands::Reset { user, kind } => {
            let removed = manager.reset(&user, kind).await?;
            println!("removed {} record(s)", removed);
            Ok(())
        }
    }
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> NimbusResult<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("nimbus"))
        .ok_or_else(|| {
            StorageError::new(StorageErrorKind::Unavailable(
                "no platform data directory; pass --data-dir".to_string(),
            ))
            .into()
        })
}

fn print_statuses(statuses: &[LimitStatus], format: OutputFormat) -> NimbusResult<()> {
    match format {
        OutputFormat::Human => {
            for status in statuses {
                println!("{}", render_status(status));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(statuses)
                .map_err(|e| JsonError::new(e.to_string()))?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn print_consumption(consumption: &Consumption, format: OutputFormat) -> NimbusResult<()> {
    match format {
        OutputFormat::Human => println!("{}", render_consumption(consumption)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "granted": consumption.is_granted(),
                "status": consumption.status(),
            }))
            .map_err(|e| JsonError::new(e.to_string()))?;
            println!("{}", json);
        }
    }
    Ok(())
}

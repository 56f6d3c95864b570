mod cli;
mod config;
mod datasources;
mod db;
mod error;
mod logic;
mod models;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, DATABASE_URL_ENV};
use db::{Database, SeedData};
use logic::StatusService;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging on stderr; stdout carries the JSON output
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = match Config::load(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Please copy config/config.yaml.example to config/config.yaml");
            std::process::exit(1);
        }
    };
    if let Some(url) = cli.database_url {
        config.storage.database_url = Some(url);
    }

    let location = match config.storage.location() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!(
                "Set storage.database_url in config.yaml or the {} environment variable",
                DATABASE_URL_ENV
            );
            std::process::exit(1);
        }
    };

    let db = Database::open(&location)
        .with_context(|| format!("Failed to open database {:?}", location))?;
    let service = StatusService::new(config, db.clone())?;

    let now = chrono::Utc::now();
    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => print_json(&service.status().await?),
        Commands::History { hours, limit } => print_json(&service.history(now, hours, limit)?),
        Commands::Analytics { days } => print_json(&service.analytics(now, days)?),
        Commands::Fields => print_json(&service.fields()?),
        Commands::Crops => print_json(&service.crops()?),
        Commands::Crop {
            crop_type,
            hours,
            limit,
        } => print_json(&service.crop_detail(&crop_type, now, hours, limit)?),
        Commands::Recommendations { limit } => print_json(&service.recommendations(limit)?),
        Commands::Import { file } => {
            let seed = SeedData::from_file(&file)
                .with_context(|| format!("Failed to load seed data from {}", file.display()))?;
            print_json(&seed.import(&db)?)
        }
        Commands::Check => print_json(&service.check().await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agrisense",
    version,
    about = "Irrigation recommendations, anomaly alerts and crop health from soil telemetry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the storage URL (sqlite://path, a bare path, or :memory:)
    #[arg(short, long)]
    pub database_url: Option<String>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assess the latest sample (default)
    Status,
    /// Samples from the recent window, oldest first
    History {
        #[arg(long, default_value_t = 24)]
        hours: u32,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Moisture, temperature and efficiency summary
    Analytics {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// One assessed field per crop type
    Fields,
    /// Record counts and latest sample per crop type
    Crops,
    /// Samples and averages for one crop type
    Crop {
        crop_type: String,
        #[arg(long, default_value_t = 24)]
        hours: u32,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Logged recommendations, newest first
    Recommendations {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Load crops, samples and alerts from a JSON file
    Import { file: PathBuf },
    /// Validate config and test connections
    Check,
}

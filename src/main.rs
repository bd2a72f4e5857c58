pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod grid;
pub mod join;
pub mod pipeline;
pub mod types;
pub mod wurman;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a point collection into a hexbin choropleth
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Override the input point collection
        #[arg(long)]
        input: Option<PathBuf>,
        /// Override the hexagon output file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override the hexagon edge length
        #[arg(long)]
        side: Option<f64>,
        /// Also emit the Wurman dot circle collections
        #[arg(long)]
        wurman: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            input,
            output,
            side,
            wurman,
        } => {
            let mut app_config = config::AppConfig::load_from_file(&config)?;
            app_config.apply_overrides(input, output, side, wurman);
            app_config.validate()?;
            pipeline::run(&app_config)
        }
    }
}

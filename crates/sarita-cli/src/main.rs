//! SARITA CLI - offline upsampling of microphone-array recordings.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sarita")]
#[command(author, version, about = "SARITA microphone-array upsampler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a geometry or WAV file, or list installed geometries
    Info(commands::info::InfoArgs),

    /// Upsample a sparse array recording onto the dense grid
    Upsample(commands::upsample::UpsampleArgs),

    /// Generate demo geometries and test signals
    Generate(commands::generate::GenerateArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Upsample(args) => commands::upsample::run(args),
        Commands::Generate(args) => commands::generate::run(args),
    }
}

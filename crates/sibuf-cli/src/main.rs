//! sibuf CLI - bench tooling for the serial punch buffer.

mod commands;
mod punch;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sibuf")]
#[command(author, version, about = "Serial punch buffer bench tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay generated punches through a simulated buffer and verify them
    Simulate(commands::simulate::SimulateArgs),

    /// Write a punch stream to a file
    Generate(commands::generate::GenerateArgs),

    /// List, show and export relay profiles
    Profiles(commands::profiles::ProfilesArgs),

    /// Show the board pin table and UART bring-up sequence
    Board(commands::board::BoardArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Profiles(args) => commands::profiles::run(args),
        Commands::Board(args) => commands::board::run(args),
    }
}

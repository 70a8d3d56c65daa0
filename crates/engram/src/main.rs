//! engram - a tool-using agent with tiered memory

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

use commands::{engage_command, init_command, status_command};

/// engram - agent with tiered memory for your terminal
#[derive(Parser)]
#[command(name = "engram")]
#[command(about = "A tool-using agent with tiered memory")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config, workspace and archive directories
    Init,
    /// Chat with the agent
    Engage {
        /// One-shot message; omit for an interactive session
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Show configuration and archive status
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engram=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Engage { message } => engage_command(message).await,
        Commands::Status => status_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

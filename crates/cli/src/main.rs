//! Warden CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive or single-message chat with a defended agent
//! - `status`  — Show configuration and check provider/memory reachability
//! - `config`  — Print the default configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "warden",
    about = "Warden — prompt-injection-hardened customer-support agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a customer agent
    Chat {
        /// Customer id the conversation belongs to
        #[arg(long, default_value = "default")]
        agent_id: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Keep knowledge in process instead of on a Hippocampus server
        #[arg(long)]
        in_memory: bool,
    },

    /// Show configuration and reachability of provider and memory
    Status,

    /// Print the default configuration TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            agent_id,
            message,
            in_memory,
        } => commands::chat::run(agent_id, message, in_memory).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Config => commands::config_cmd::run(),
    }

    Ok(())
}

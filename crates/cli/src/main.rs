//! Shopbot CLI, the main entry point.
//!
//! Commands:
//! - `init`     Write a default config file
//! - `doctor`   Validate config and report missing credentials
//! - `intents`  List a tenant's enabled intents
//! - `context`  Print a tenant's static context
//! - `chat`     Route and answer one customer message (JSON out)
//! - `ask`      Answer from instruction + full tenant context

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "shopbot",
    about = "Shopbot: retrieval-augmented customer chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.shopbot/config.toml)
    #[arg(short, long, global = true, env = "SHOPBOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration and credentials
    Doctor,

    /// List the enabled intents of a tenant
    Intents {
        #[arg(short, long)]
        business_id: i64,
    },

    /// Print the static context of a tenant
    Context {
        #[arg(short, long)]
        business_id: i64,

        /// Rebuild instead of using the context cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Answer one customer message through intent routing
    Chat {
        #[arg(short, long)]
        business_id: i64,

        #[arg(short = 'u', long, default_value_t = 0)]
        customer_id: i64,

        /// JSON file holding the conversation history
        #[arg(long)]
        history: Option<PathBuf>,

        message: String,
    },

    /// Answer from an instruction plus the full tenant context
    Ask {
        #[arg(short, long)]
        business_id: i64,

        /// Replace the default sales instruction
        #[arg(short, long)]
        instruction: Option<String>,

        /// JSON file holding the conversation history
        #[arg(long)]
        history: Option<PathBuf>,

        #[arg(long)]
        no_cache: bool,

        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `chat` output stays machine-readable
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Intents { business_id } => commands::intents::run(config_path, business_id).await?,
        Commands::Context { business_id, no_cache } => {
            commands::context::run(config_path, business_id, !no_cache).await?
        }
        Commands::Chat {
            business_id,
            customer_id,
            history,
            message,
        } => commands::chat::run(config_path, business_id, customer_id, history.as_deref(), &message).await?,
        Commands::Ask {
            business_id,
            instruction,
            history,
            no_cache,
            message,
        } => {
            commands::ask::run(
                config_path,
                business_id,
                instruction.as_deref(),
                history.as_deref(),
                !no_cache,
                &message,
            )
            .await?
        }
    }

    Ok(())
}

//! Main entry point for Relay Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod core;
mod providers;

use cli::commands::Commands;

/// Relay Translator - Multi-provider batch translation tool
#[derive(Parser, Debug)]
#[command(name = "relay-translator", version, about, long_about = None)]
struct Args {
    /// Source language code (default: from configuration)
    #[arg(long)]
    source_lang: Option<String>,

    /// Target language code (default: from configuration)
    #[arg(long)]
    target_lang: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("relay_translator={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Language overrides flow to the config through the environment
    if let Some(source_lang) = args.source_lang {
        std::env::set_var("SOURCE_LANG", source_lang);
    }
    if let Some(target_lang) = args.target_lang {
        std::env::set_var("TARGET_LANG", target_lang);
    }

    match args.command {
        Some(Commands::Files {
            file,
            output,
            batch_size,
        }) => {
            cli::commands::handle_files(file, output, batch_size).await?;
        }
        Some(Commands::Text { text }) => {
            cli::commands::handle_text(text).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}

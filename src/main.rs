mod chat_client;
mod cli;
mod config;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use crate::chat_client::ChatClient;
use crate::cli::chat::ChatContext;
use crate::cli::chat::view::OutputFormat;
use crate::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input to send to the chat
    #[arg(short, long)]
    input: Option<String>,

    /// Chat server base URL (defaults to CHAT_SERVER_URL, then HOST/PORT)
    #[arg(short, long)]
    server: Option<String>,

    /// How replies are printed
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Input to send to the chat
        #[arg(short, long)]
        input: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let (input, verbose) = match cli.command {
        Some(Commands::Chat { input, verbose }) => (input.or(cli.input), verbose || cli.verbose),
        None => (cli.input, cli.verbose),
    };

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match Config::resolve(cli.server, cli.format) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let client = ChatClient::new(&config.server_url)?;
    info!(endpoint = %client.endpoint(), "Starting Advisor Chat CLI");

    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        input,
        true,
        config.format,
        Box::new(client),
    );
    chat_context.run().await
}

pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::DatabaseManager;
use crate::mail::LogMailer;
use crate::state::{AppState, SharedState};
use crate::storage::MediaStorage;

#[derive(Parser)]
#[command(name = "cinea")]
#[command(about = "Cinea CLI - Administration for the Cinea API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create collection tables and indexes in DATABASE_URL")]
    Migrate,

    #[command(about = "Premium signup list management")]
    Premium {
        #[command(subcommand)]
        cmd: commands::premium::PremiumCommands,
    },

    #[command(about = "Issue a session token for an existing user")]
    Token {
        #[arg(help = "Email of the user")]
        email: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// State for commands that go through the services; mail is only logged
pub async fn admin_state() -> anyhow::Result<SharedState> {
    let store = DatabaseManager::open_store().await?;
    Ok(AppState::with_parts(store, Arc::new(LogMailer), MediaStorage::in_memory()))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Premium { cmd } => commands::premium::handle(cmd, output_format).await,
        Commands::Token { email } => commands::token::handle(&email, output_format).await,
    }
}

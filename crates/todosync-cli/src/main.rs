//! todosync - a command-line client for the todosync to-do service.
//!
//! Sign in, look at your profile and manage your to-do list from the
//! terminal. Every command is a single round trip against the configured
//! server; nothing is cached between runs except the session token.

mod app;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

#[derive(Parser, Debug)]
#[command(name = "todosync", version, about = "Manage your to-do list from the terminal")]
struct Cli {
    /// Server base URL (overrides TODOSYNC_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session token
    Login {
        /// Defaults to the last username used
        username: Option<String>,
    },
    /// Create an account
    Register { username: String, email: String },
    /// Forget the stored session token
    Logout,
    /// Show whether a session token is stored
    Status,
    /// Show the signed-in account
    Profile,
    /// List your to-dos
    List,
    /// Add a to-do
    Add { title: String, description: String },
    /// Delete a to-do by id
    Remove { id: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut app = App::new(cli.api_url)?;
    info!(api_url = %app.api_url(), command = ?cli.command, "todosync starting");

    let outcome = match cli.command {
        Command::Login { username } => app.login(username).await,
        Command::Register { username, email } => app.register(&username, &email).await,
        Command::Logout => app.logout(),
        Command::Status => app.status(),
        Command::Profile => app.profile().await,
        Command::List => app.list().await,
        Command::Add { title, description } => app.add(&title, &description).await,
        Command::Remove { id } => app.remove(&id).await,
    };

    if let Err(notice) = outcome {
        eprintln!("{}", notice);
        std::process::exit(1);
    }
    Ok(())
}

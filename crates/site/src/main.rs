//! Vestibule server binary.

use std::io::{self, BufRead};
use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use vestibule_site::{AppState, Config, app, credentials, logging};

/// Vestibule site front-end.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Print an Argon2id hash suitable for ADMIN_PASSWORD_HASH.
    HashPassword {
        /// Password to hash. Read from the first line of stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::HashPassword { password } => hash_password(password),
    }
}

async fn serve() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Configuration errors abort before anything is bound
    let config = Config::from_env().context("failed to load configuration")?;

    logging::init(&config)?;

    let state = AppState::new(config).context("failed to initialize application state")?;

    let addr = SocketAddr::new(state.config().host, state.config().port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;
    let bound = listener.local_addr().context("failed to read bound address")?;

    logging::log_startup(state.config(), bound);

    axum::serve(listener, app(state))
        .await
        .context("server error")?;

    Ok(())
}

fn hash_password(password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        bail!("password must not be empty");
    }

    println!("{}", credentials::hash_password(&password)?);
    Ok(())
}

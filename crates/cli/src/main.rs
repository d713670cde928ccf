//! Swan Botanical CLI - drive the session engine from a terminal.
//!
//! State lives in a directory (`--state-dir`, `SWAN_STATE_DIR`, or
//! `.swan-session` in the working directory), so a cart or login survives
//! between invocations the same way it survives a page reload.
//!
//! # Usage
//!
//! ```bash
//! # Put two cleansers in the cart
//! swan-cli cart add p1 --name "Gentle Botanical Cleanser" --price 899 --quantity 2
//!
//! # Show the cart with its total
//! swan-cli cart show
//!
//! # Log in, then like a product on the server-held wishlist
//! swan-cli auth login -e asha@example.com -p secret
//! SWAN_WISHLIST_SYNC=server swan-cli wishlist toggle p9 --name "Rose Toner"
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and edit cart lines
//! - `wishlist` - Show and edit the wishlist
//! - `auth` - Log in, register, log out, show the session

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use swan_botanical_session::{SessionConfig, SessionProvider};

mod commands;

const DEFAULT_STATE_DIR: &str = ".swan-session";

#[derive(Parser)]
#[command(name = "swan-cli")]
#[command(author, version, about = "Swan Botanical session tools")]
struct Cli {
    /// Directory holding persisted session state
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Show and edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: commands::wishlist::WishlistAction,
    },
    /// Manage the logged-in session
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "swan_botanical_session=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = SessionConfig::from_env()?;
    if let Some(dir) = cli.state_dir {
        config.state_dir = Some(dir);
    } else if config.state_dir.is_none() {
        config.state_dir = Some(PathBuf::from(DEFAULT_STATE_DIR));
    }

    let provider = SessionProvider::open(config)?;
    provider.initialize();

    match cli.command {
        Commands::Cart { action } => commands::cart::run(&provider, action),
        Commands::Wishlist { action } => commands::wishlist::run(&provider, action).await?,
        Commands::Auth { action } => commands::auth::run(&provider, action).await?,
    }
    Ok(())
}

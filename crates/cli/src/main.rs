//! Toko CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (including the session table)
//! toko-cli migrate
//!
//! # Delete expired cart items for every user
//! toko-cli carts purge-expired
//!
//! # Create an admin user
//! toko-cli users create -e admin@toko.test -n "Admin" -p 'long password' -r ADMIN
//!
//! # Change a user's role
//! toko-cli users promote -e someone@toko.test -r ADMIN
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "toko-cli")]
#[command(author, version, about = "Toko CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Cart maintenance
    Carts {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Delete expired cart items for all users
    PurgeExpired,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`USER` or `ADMIN`)
        #[arg(short, long, default_value = "USER")]
        role: String,
    },
    /// Change an existing user's role
    Promote {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`USER` or `ADMIN`)
        #[arg(short, long, default_value = "ADMIN")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Carts { action } => match action {
            CartAction::PurgeExpired => {
                let purged = commands::carts::purge_expired().await?;
                tracing::info!("Purged {purged} expired cart items");
            }
        },
        Commands::Users { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::users::create(&email, &name, &password, &role).await?;
            }
            UserAction::Promote { email, role } => {
                commands::users::promote(&email, &role).await?;
            }
        },
    }
    Ok(())
}

//! Mi Store CLI - database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema migrations
//! ms-cli migrate
//!
//! # Create a staff account (password from -p or MISTORE_ADMIN_PASSWORD)
//! ms-cli admin create -e ops@mistore.uk -n "Ops Team"
//!
//! # Give an existing customer account the admin role
//! ms-cli admin promote -e lead@mistore.uk
//!
//! # Load categories, products, home sections and coupons
//! ms-cli seed --file crates/cli/seed/catalog.yaml
//! ```
//!
//! Every command reads `DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

const DEFAULT_SEED_FILE: &str = "crates/cli/seed/catalog.yaml";

#[derive(Parser)]
#[command(name = "ms-cli")]
#[command(author, version, about = "Mi Store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long, default_value = DEFAULT_SEED_FILE)]
        file: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 8 characters)
        #[arg(short, long, env = "MISTORE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Grant the admin role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
            AdminAction::Promote { email } => {
                commands::admin::promote(&email).await?;
            }
        },
        Commands::Seed { file } => {
            commands::seed::from_file(&file).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_file_defaults() {
        let cli = Cli::try_parse_from(["ms-cli", "seed"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed { file } if file == DEFAULT_SEED_FILE));
    }

    #[test]
    fn test_admin_create_takes_password_flag() {
        let cli = Cli::try_parse_from([
            "ms-cli", "admin", "create", "-e", "ops@mistore.uk", "-n", "Ops", "-p", "hunter2hunter2",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Admin {
                action: AdminAction::Create { password, .. }
            } if password == "hunter2hunter2"
        ));
    }
}

//! Siddha clinic CLI - out-of-band administration.
//!
//! The website never grants roles. Promoting an account to admin is done
//! here, with the project's service role key, which bypasses row-level
//! security.
//!
//! # Usage
//!
//! ```bash
//! # Grant the admin role to a registered account
//! siddha-cli role grant 6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b
//!
//! # Revoke it again
//! siddha-cli role revoke 6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b
//!
//! # List role grants
//! siddha-cli role list
//!
//! # Provision the doctor profile and settings rows
//! siddha-cli seed
//!
//! # Validate the site configuration without starting the server
//! siddha-cli config check
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Project URL
//! - `SUPABASE_ANON_KEY` - Public anon key (validated alongside the others)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service role key (required for `role` and `seed`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use uuid::Uuid;

use siddha_clinic_core::AppRole;

mod commands;

#[derive(Parser)]
#[command(name = "siddha-cli")]
#[command(author, version, about = "Siddha clinic administration tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage role grants in `user_roles`
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Provision the doctor profile and settings rows if missing
    Seed,
    /// Inspect the site configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Grant a role to an account
    Grant {
        /// Account id from the identity service
        user_id: Uuid,

        /// Role (`admin`, `moderator`, `user`)
        #[arg(short, long, default_value = "admin")]
        role: AppRole,
    },
    /// Revoke a role from an account
    Revoke {
        /// Account id from the identity service
        user_id: Uuid,

        /// Role (`admin`, `moderator`, `user`)
        #[arg(short, long, default_value = "admin")]
        role: AppRole,
    },
    /// List every role grant
    List,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the configuration the server would use
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Role { action } => {
            let client = commands::service_client()?;
            match action {
                RoleAction::Grant { user_id, role } => {
                    commands::roles::grant(&client, user_id.into(), role).await?;
                }
                RoleAction::Revoke { user_id, role } => {
                    commands::roles::revoke(&client, user_id.into(), role).await?;
                }
                RoleAction::List => commands::roles::list(&client).await?,
            }
        }
        Commands::Seed => {
            let client = commands::service_client()?;
            commands::seed::singletons(&client).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Check => commands::config::check()?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_role_defaults_to_admin() {
        let cli = Cli::try_parse_from([
            "siddha-cli",
            "role",
            "grant",
            "6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        match cli.command {
            Commands::Role {
                action: RoleAction::Grant { role, .. },
            } => assert_eq!(role, AppRole::Admin),
            _ => panic!("expected role grant"),
        }
    }

    #[test]
    fn test_rejects_unknown_role() {
        assert!(
            Cli::try_parse_from([
                "siddha-cli",
                "role",
                "grant",
                "6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b",
                "--role",
                "owner",
            ])
            .is_err()
        );
    }
}

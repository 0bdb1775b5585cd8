use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Upper bound for `tokens create --expires-in-days` (about 100 years).
pub const MAX_EXPIRY_DAYS: i64 = 36_500;

/// PAT dashboard: personal access tokens backed by Logto
#[derive(Parser)]
#[command(name = "pat-dashboard", version, about)]
pub struct Cli {
    /// CLI settings file (default is $HOME/.logto-playground.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the dashboard server
    Serve {
        /// Port to bind (defaults to DASHBOARD_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage the personal access token stored in the CLI settings
    Pat {
        #[command(subcommand)]
        command: PatCommands,
    },

    /// Deployment helpers that talk to Logto
    Deploy {
        #[command(subcommand)]
        command: DeployCommands,
    },

    /// Manage a user's personal access tokens through the Management API
    Tokens {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum PatCommands {
    /// Add or update your personal access token
    Add { token: String },
}

#[derive(Subcommand)]
pub enum DeployCommands {
    /// Exchange the stored PAT for a Logto access token and print it
    Test,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// List a user's tokens
    List {
        #[arg(long)]
        user_id: String,
    },
    /// Create a token for a user
    Create {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        name: String,
        /// Days until expiry (the dashboard offers 7, 30, 180, 365). Omit for never.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_EXPIRY_DAYS))]
        expires_in_days: Option<u32>,
    },
    /// Delete a user's token by name
    Revoke {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens_create() {
        let cli = Cli::try_parse_from([
            "pat-dashboard",
            "tokens",
            "create",
            "--user-id",
            "u1",
            "--name",
            "ci",
            "--expires-in-days",
            "30",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Tokens {
                command:
                    TokenCommands::Create {
                        user_id,
                        name,
                        expires_in_days,
                    },
            }) => {
                assert_eq!(user_id, "u1");
                assert_eq!(name, "ci");
                assert_eq!(expires_in_days, Some(30));
            }
            _ => panic!("expected tokens create"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from([
            "pat-dashboard",
            "pat",
            "add",
            "pat_abc",
            "--config",
            "/tmp/cfg.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cfg.yaml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Pat {
                command: PatCommands::Add { .. }
            })
        ));
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["pat-dashboard"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_expires_in_days_is_bounded() {
        for days in ["0", "36501", "4294967295"] {
            let parsed = Cli::try_parse_from([
                "pat-dashboard",
                "tokens",
                "create",
                "--user-id",
                "u1",
                "--name",
                "ci",
                "--expires-in-days",
                days,
            ]);
            assert!(parsed.is_err(), "{} days should be rejected", days);
        }
    }
}

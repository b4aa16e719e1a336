pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mindlog")]
#[command(about = "MindLog CLI - operator tooling for the MindLog API")]
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
    #[command(about = "Apply database migrations to DATABASE_URL")]
    Migrate,

    #[command(about = "Mint a session token with the configured JWT secret")]
    Token {
        #[arg(long, help = "User id to issue the token for")]
        user_id: Uuid,
    },

    #[command(about = "Passcode changes and re-encryption status")]
    Passphrase {
        #[command(subcommand)]
        cmd: commands::passphrase::PassphraseCommands,
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::database::migrate(output_format).await,
        Commands::Token { user_id } => commands::token::handle(user_id, output_format),
        Commands::Passphrase { cmd } => commands::passphrase::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_passphrase_commands() {
        let cli = Cli::try_parse_from([
            "mindlog",
            "--json",
            "passphrase",
            "change",
            "--passcode",
            "1234",
            "--token",
            "abc",
            "--client-salt",
            "AAAA",
        ])
        .unwrap();

        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Passphrase {
                cmd:
                    commands::passphrase::PassphraseCommands::Change {
                        passcode,
                        client_salt,
                        ..
                    },
            } => {
                assert_eq!(passcode.as_deref(), Some("1234"));
                assert_eq!(client_salt.as_deref(), Some("AAAA"));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn passcode_is_not_a_positional_argument() {
        assert!(Cli::try_parse_from([
            "mindlog", "passphrase", "change", "1234", "--token", "abc"
        ])
        .is_err());

        let cli =
            Cli::try_parse_from(["mindlog", "passphrase", "change", "--token", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Passphrase {
                cmd: commands::passphrase::PassphraseCommands::Change { .. }
            }
        ));
    }

    #[test]
    fn token_requires_a_uuid() {
        assert!(Cli::try_parse_from(["mindlog", "token", "--user-id", "nope"]).is_err());
    }
}

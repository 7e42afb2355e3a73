//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Manage a login session with an OAuth identity provider.
#[derive(Debug, Parser)]
#[command(name = "warden", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags that feed the configuration layers.
#[derive(Debug, Default, Clone, Args)]
pub struct ConfigArgs {
    /// Configuration file (TOML). Defaults to an optional `warden.toml`.
    #[arg(long, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding persisted credentials.
    #[arg(long, global = true, env = "WARDEN_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Client identifier registered at the provider.
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Provider domain, e.g. `tenant.eu.auth0.com`.
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Explicit issuer base URL.
    #[arg(long, global = true)]
    pub issuer: Option<String>,

    /// Local port the browser is redirected back to.
    #[arg(long, global = true)]
    pub callback_port: Option<u16>,

    /// Space-separated scopes requested at login.
    #[arg(long, global = true)]
    pub scope: Option<String>,

    /// API audience requested at login.
    #[arg(long, global = true)]
    pub audience: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in through the browser.
    Login,
    /// End the session locally and at the provider.
    Logout,
    /// Show the state of the stored credentials.
    Status,
    /// Read or change user metadata.
    #[command(subcommand)]
    Metadata(MetadataCommand),
    /// Show the current access token, refreshing it if needed.
    Token {
        /// Print the raw token value.
        #[arg(long)]
        reveal: bool,
    },
    /// Renew the credentials with the renewal scope.
    Renew,
}

#[derive(Debug, Subcommand)]
pub enum MetadataCommand {
    /// Print all metadata, or one key.
    Get {
        /// Metadata key.
        key: Option<String>,
    },
    /// Set one or more keys.
    Set {
        /// `KEY=VALUE` pairs; values are parsed as JSON, falling back to a string.
        #[arg(required = true, value_parser = parse_assignment)]
        entries: Vec<(String, serde_json::Value)>,
    },
}

/// Parses `KEY=VALUE`.
fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("metadata key must not be empty".to_string());
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("country=US").unwrap(),
            ("country".to_string(), json!("US"))
        );
        assert_eq!(
            parse_assignment("age=42").unwrap(),
            ("age".to_string(), json!(42))
        );
        assert_eq!(
            parse_assignment("note=a=b").unwrap(),
            ("note".to_string(), json!("a=b"))
        );
        assert!(parse_assignment("country").is_err());
        assert!(parse_assignment(" =US").is_err());
    }

    #[test]
    fn test_parse_metadata_set() {
        let cli = Cli::try_parse_from([
            "warden",
            "metadata",
            "set",
            "country=US",
            "--domain",
            "t.example.com",
        ])
        .unwrap();
        assert_eq!(cli.config.domain.as_deref(), Some("t.example.com"));
        match cli.command {
            Command::Metadata(MetadataCommand::Set { entries }) => {
                assert_eq!(entries, vec![("country".to_string(), json!("US"))]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_metadata_set_requires_entries() {
        assert!(Cli::try_parse_from(["warden", "metadata", "set"]).is_err());
    }

    #[test]
    fn test_token_reveal_flag() {
        let cli = Cli::try_parse_from(["warden", "token", "--reveal"]).unwrap();
        assert!(matches!(cli.command, Command::Token { reveal: true }));
    }
}

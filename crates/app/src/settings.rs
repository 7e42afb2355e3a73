//! Layered configuration: `warden.toml`, then `WARDEN_*` variables, then
//! command-line flags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use warden_domain::{DomainError, IdentityConfig};
use warden_infrastructure::{FileCredentialRepository, TokioFileSystem};

use crate::cli::ConfigArgs;

/// File read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "warden.toml";

/// Prefix of the environment variables read as configuration.
pub const ENV_PREFIX: &str = "WARDEN";

/// Errors raised while assembling the configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("no credential directory: pass --store-dir or set WARDEN_STORE_DIR")]
    NoStoreDir,
}

/// Everything the binary needs to wire the session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub identity: IdentityConfig,
    pub store_dir: PathBuf,
}

/// Loads settings from the process environment.
pub fn load(args: &ConfigArgs) -> Result<Settings, LoadError> {
    load_with_env(args, None)
}

/// Loads settings, reading variables from `env` instead of the process
/// environment when given.
pub fn load_with_env(
    args: &ConfigArgs,
    env: Option<HashMap<String, String>>,
) -> Result<Settings, LoadError> {
    let (path, required) = args
        .config
        .as_deref()
        .map_or((Path::new(DEFAULT_CONFIG_FILE), false), |path| (path, true));

    let config = Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        )
        .set_override_option("client_id", args.client_id.clone())?
        .set_override_option("domain", args.domain.clone())?
        .set_override_option("issuer", args.issuer.clone())?
        .set_override_option("callback_port", args.callback_port.map(i64::from))?
        .set_override_option("scope", args.scope.clone())?
        .set_override_option("audience", args.audience.clone())?
        .build()?;

    let identity: IdentityConfig = config.try_deserialize()?;
    identity.validate()?;

    let store_dir = args
        .store_dir
        .clone()
        .or_else(FileCredentialRepository::<TokioFileSystem>::default_dir)
        .ok_or(LoadError::NoStoreDir)?;

    Ok(Settings {
        identity,
        store_dir,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args_with_store() -> ConfigArgs {
        ConfigArgs {
            store_dir: Some(PathBuf::from("/tmp/warden-test")),
            ..ConfigArgs::default()
        }
    }

    #[test]
    fn test_file_only() {
        let file = toml_file(
            "client_id = \"abc\"\ndomain = \"tenant.auth0.com\"\ncallback_port = 9090\n",
        );
        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            ..args_with_store()
        };

        let settings = load_with_env(&args, env(&[])).unwrap();

        assert_eq!(
            settings.identity,
            IdentityConfig::new("abc", "tenant.auth0.com").with_callback_port(9090)
        );
        assert_eq!(settings.store_dir, PathBuf::from("/tmp/warden-test"));
    }

    #[test]
    fn test_env_overrides_file_and_flags_override_env() {
        let file = toml_file("client_id = \"from-file\"\ndomain = \"file.auth0.com\"\n");
        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            domain: Some("flag.auth0.com".to_string()),
            ..args_with_store()
        };

        let settings = load_with_env(
            &args,
            env(&[
                ("WARDEN_CLIENT_ID", "from-env"),
                ("WARDEN_DOMAIN", "env.auth0.com"),
                ("WARDEN_EXPIRY_MARGIN_SECS", "120"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.identity.client_id, "from-env");
        assert_eq!(settings.identity.domain, "flag.auth0.com");
        assert_eq!(settings.identity.expiry_margin_secs, 120);
    }

    #[test]
    fn test_flags_alone_are_enough() {
        let args = ConfigArgs {
            client_id: Some("abc".to_string()),
            domain: Some("tenant.auth0.com".to_string()),
            scope: Some("openid offline_access".to_string()),
            ..args_with_store()
        };

        let settings = load_with_env(&args, env(&[])).unwrap();

        assert_eq!(settings.identity.scope, "openid offline_access");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/warden.toml")),
            ..args_with_store()
        };

        assert!(matches!(
            load_with_env(&args, env(&[])),
            Err(LoadError::Source(_))
        ));
    }

    #[test]
    fn test_invalid_domain_is_rejected() {
        let args = ConfigArgs {
            client_id: Some("abc".to_string()),
            domain: Some("https://tenant.auth0.com".to_string()),
            ..args_with_store()
        };

        assert!(matches!(
            load_with_env(&args, env(&[])),
            Err(LoadError::Invalid(DomainError::InvalidConfig(_)))
        ));
    }
}

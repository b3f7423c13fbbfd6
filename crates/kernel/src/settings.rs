use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::credential::{BuiltinRole, UserCredential, DEFAULT_DATABASE};
use crate::error::ProvisionError;
use crate::secret::SecretStore;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "PRS_ENV";
const CONFIG_DIR_ENV: &str = "PRS_CONFIG_DIR";
const ENV_PREFIX: &str = "PRS";

/// Deployment environment the provisioner is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub mongo: MongoSettings,
    #[serde(default)]
    pub credential: CredentialSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(None, None)
    }

    /// Like [`Settings::load`], with explicit overrides for the config
    /// directory and environment name (e.g. from command-line flags).
    pub fn load_with(
        config_dir: Option<PathBuf>,
        environment: Option<String>,
    ) -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = match environment {
            Some(environment) => environment,
            None => std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string()),
        };
        let config_dir = config_dir.or_else(|| std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from));
        let config_dir = match config_dir {
            Some(dir) => dir,
            // Default to the `config` directory under the working directory.
            None => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load `base.toml` and `<environment>.toml` from `config_dir`, then apply
    /// `PRS_`-prefixed environment variables (`PRS_MONGO__URI`).
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The selected environment wins over whatever the files declare.
        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoSettings {
    /// Administrative connection URI. May embed admin credentials, so it is
    /// never logged verbatim.
    #[serde(default = "MongoSettings::default_uri")]
    pub uri: String,
    #[serde(default = "MongoSettings::default_database")]
    pub database: String,
    #[serde(default = "MongoSettings::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "MongoSettings::default_app_name")]
    pub app_name: String,
    /// Drop every collection in `database` before provisioning.
    #[serde(default)]
    pub clean: bool,
}

impl MongoSettings {
    fn default_uri() -> String {
        "mongodb://localhost:27017".to_string()
    }

    fn default_database() -> String {
        DEFAULT_DATABASE.to_string()
    }

    fn default_connect_timeout_ms() -> u64 {
        10_000
    }

    fn default_app_name() -> String {
        "prs-provision".to_string()
    }
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            database: Self::default_database(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            app_name: Self::default_app_name(),
            clean: false,
        }
    }
}

/// What to do when the account already exists.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExistingUserPolicy {
    /// Fail with a duplicate-user error.
    #[default]
    Fail,
    /// Leave the existing account untouched and report it as skipped.
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSettings {
    #[serde(default = "CredentialSettings::default_username")]
    pub username: String,
    #[serde(default)]
    pub role: BuiltinRole,
    /// Name of the secret holding the password; read from the environment
    /// variable of that name or from the file named by `<NAME>_FILE`.
    #[serde(default = "CredentialSettings::default_password_env")]
    pub password_env: String,
    #[serde(default)]
    pub on_existing: ExistingUserPolicy,
}

impl CredentialSettings {
    fn default_username() -> String {
        "app-user".to_string()
    }

    fn default_password_env() -> String {
        "PRS_APP_PASSWORD".to_string()
    }

    /// Acquire the password and build the credential for `database`.
    pub fn resolve(
        &self,
        database: &str,
        secrets: &dyn SecretStore,
    ) -> Result<UserCredential, ProvisionError> {
        let password = secrets.fetch(&self.password_env)?;
        UserCredential::new(self.username.clone(), password, database, self.role)
    }
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            username: Self::default_username(),
            role: BuiltinRole::default(),
            password_env: Self::default_password_env(),
            on_existing: ExistingUserPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecretError;
    use crate::secret::SecretString;

    struct FixedSecret(Option<&'static str>);

    impl SecretStore for FixedSecret {
        fn fetch(&self, name: &str) -> Result<SecretString, SecretError> {
            self.0
                .map(SecretString::from)
                .ok_or_else(|| SecretError::Missing(name.to_string()))
        }
    }

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn defaults_target_payment_registration_system() {
        let settings = Settings::default();
        assert_eq!(settings.mongo.uri, "mongodb://localhost:27017");
        assert_eq!(settings.mongo.database, "payment_registration_system");
        assert_eq!(settings.mongo.connect_timeout_ms, 10_000);
        assert!(!settings.mongo.clean);
        assert_eq!(settings.credential.username, "app-user");
        assert_eq!(settings.credential.role, BuiltinRole::ReadWrite);
        assert_eq!(settings.credential.on_existing, ExistingUserPolicy::Fail);
    }

    #[test]
    fn environment_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[mongo]\ndatabase = \"base_db\"\nclean = true\n\n[credential]\nusername = \"svc\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "[mongo]\ndatabase = \"staging_db\"\n\n[credential]\non_existing = \"skip\"\nrole = \"read\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path(), "staging").unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.mongo.database, "staging_db");
        assert!(settings.mongo.clean);
        assert_eq!(settings.credential.username, "svc");
        assert_eq!(settings.credential.role, BuiltinRole::Read);
        assert_eq!(settings.credential.on_existing, ExistingUserPolicy::Skip);
        assert_eq!(settings.mongo.uri, "mongodb://localhost:27017");
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path(), "local").unwrap();
        assert_eq!(settings.mongo.database, "payment_registration_system");
    }

    #[test]
    fn unknown_role_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[credential]\nrole = \"superuser\"\n",
        )
        .unwrap();
        assert!(Settings::load_from(dir.path(), "local").is_err());
    }

    #[test]
    fn unsupported_environment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(dir.path(), "qa").unwrap_err();
        assert!(err.to_string().contains("unsupported environment 'qa'"));
    }

    #[test]
    fn resolve_builds_credential_scoped_to_database() {
        let credential = CredentialSettings::default()
            .resolve("payment_registration_system", &FixedSecret(Some("app-pwd")))
            .unwrap();
        assert_eq!(credential.username(), "app-user");
        assert_eq!(credential.password().expose(), "app-pwd");
        assert_eq!(credential.role_grant().db, "payment_registration_system");
    }

    #[test]
    fn resolve_fails_without_secret() {
        let err = CredentialSettings::default()
            .resolve("payment_registration_system", &FixedSecret(None))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Secret(SecretError::Missing(_))));
    }
}

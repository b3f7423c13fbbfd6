//! Secret values and the stores they are acquired from.
//!
//! Credentials are never embedded in source or settings files. They are
//! looked up by name at provisioning time from a [`SecretStore`]; the
//! default [`EnvSecretStore`] reads `NAME` or, failing that, the file
//! pointed to by `NAME_FILE` (the convention used by container secret
//! mounts).

use std::fmt;
use std::path::Path;

use zeroize::Zeroize;

use crate::error::SecretError;

/// Placeholder printed instead of a secret value.
pub const REDACTED: &str = "[REDACTED]";

/// Wrapper that keeps a sensitive value out of logs and wipes it on drop.
pub struct Secret<T: Zeroize> {
    inner: T,
}

pub type SecretString = Secret<String>;

impl<T: Zeroize> Secret<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying value. Call sites should be easy to audit.
    pub fn expose(&self) -> &T {
        &self.inner
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

/// Source of named secrets.
pub trait SecretStore: Send + Sync {
    fn fetch(&self, name: &str) -> Result<SecretString, SecretError>;
}

/// Reads secrets from the process environment, with `*_FILE` indirection.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn read_file(name: &str, path: &Path) -> Result<SecretString, SecretError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SecretError::File {
            name: name.to_string(),
            path: path.display().to_string(),
            source,
        })?;
        let value = raw.trim_end_matches(['\r', '\n']).to_string();
        let mut raw = raw;
        raw.zeroize();

        if value.is_empty() {
            return Err(SecretError::Empty(name.to_string()));
        }
        Ok(SecretString::new(value))
    }
}

impl SecretStore for EnvSecretStore {
    fn fetch(&self, name: &str) -> Result<SecretString, SecretError> {
        match std::env::var(name) {
            Ok(value) if value.is_empty() => return Err(SecretError::Empty(name.to_string())),
            Ok(value) => {
                tracing::debug!(secret = name, source = "env", "secret loaded");
                return Ok(SecretString::new(value));
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(SecretError::NotUnicode {
                    name: name.to_string(),
                })
            }
            Err(std::env::VarError::NotPresent) => {}
        }

        let file_var = format!("{name}_FILE");
        match std::env::var_os(&file_var) {
            Some(path) => {
                let secret = Self::read_file(name, Path::new(&path))?;
                tracing::debug!(secret = name, source = "file", "secret loaded");
                Ok(secret)
            }
            None => Err(SecretError::Missing(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = SecretString::from("app-pwd");
        assert_eq!(format!("{secret:?}"), REDACTED);
        assert_eq!(format!("{secret}"), REDACTED);
        assert_eq!(secret.expose(), "app-pwd");
    }

    #[test]
    fn reads_value_from_environment() {
        std::env::set_var("PRS_TEST_SECRET_ENV", "from-env");
        let secret = EnvSecretStore::new().fetch("PRS_TEST_SECRET_ENV").unwrap();
        assert_eq!(secret.expose(), "from-env");
    }

    #[test]
    fn falls_back_to_file_and_trims_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();
        std::env::set_var("PRS_TEST_SECRET_FILE_FILE", file.path());

        let secret = EnvSecretStore::new()
            .fetch("PRS_TEST_SECRET_FILE")
            .unwrap();
        assert_eq!(secret.expose(), "from-file");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = EnvSecretStore::new()
            .fetch("PRS_TEST_SECRET_NEVER_SET")
            .unwrap_err();
        assert!(matches!(err, SecretError::Missing(name) if name == "PRS_TEST_SECRET_NEVER_SET"));
    }

    #[test]
    fn empty_secret_is_an_error() {
        std::env::set_var("PRS_TEST_SECRET_EMPTY", "");
        let err = EnvSecretStore::new()
            .fetch("PRS_TEST_SECRET_EMPTY")
            .unwrap_err();
        assert!(matches!(err, SecretError::Empty(_)));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        std::env::set_var(
            "PRS_TEST_SECRET_BADFILE_FILE",
            "/nonexistent/prs/secret/path",
        );
        let err = EnvSecretStore::new()
            .fetch("PRS_TEST_SECRET_BADFILE")
            .unwrap_err();
        assert!(matches!(err, SecretError::File { .. }));
    }
}

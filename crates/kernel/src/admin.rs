use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credential::UserCredential;
use crate::error::ProvisionError;

/// A role granted to a user, scoped to one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }
}

/// An account as persisted in the instance's authentication namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: String,
    pub db: String,
    pub roles: Vec<RoleGrant>,
}

/// Administrative session against a database instance.
///
/// Implementations map their driver failures onto [`ProvisionError`] so
/// callers can tell a duplicate account apart from a missing privilege or an
/// unreachable instance.
#[async_trait]
pub trait UserAdmin: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Verify the instance answers on `db`.
    async fn ping(&self, db: &str) -> Result<(), ProvisionError>;

    /// Look up an account in `db`'s authentication namespace.
    async fn find_user(&self, db: &str, user: &str) -> Result<Option<UserRecord>, ProvisionError>;

    /// Create the account with exactly the credential's role grant.
    ///
    /// Fails with [`ProvisionError::DuplicateUser`] if the account exists;
    /// the existing account must be left untouched.
    async fn create_user(&self, credential: &UserCredential) -> Result<(), ProvisionError>;

    async fn list_collections(&self, db: &str) -> Result<Vec<String>, ProvisionError>;

    async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), ProvisionError>;
}

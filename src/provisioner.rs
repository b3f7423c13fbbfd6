//! Creates the application account with its single role grant.

use prs_kernel::{ExistingUserPolicy, ProvisionError, UserAdmin, UserCredential, UserRecord};

/// Printed once the account has been created.
pub const CONFIRMATION: &str = "MongoDB user and database created.";

/// What provisioning did to the authentication namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The account was created; holds the record as read back.
    Created(UserRecord),
    /// The account already existed and was left untouched.
    Skipped(UserRecord),
}

impl ProvisionOutcome {
    pub fn record(&self) -> &UserRecord {
        match self {
            Self::Created(record) | Self::Skipped(record) => record,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Created(_) => CONFIRMATION.to_string(),
            Self::Skipped(record) => format!(
                "MongoDB user '{}' already exists in '{}'; left unchanged.",
                record.user, record.db
            ),
        }
    }
}

pub struct Provisioner<'a> {
    admin: &'a dyn UserAdmin,
    policy: ExistingUserPolicy,
}

impl<'a> Provisioner<'a> {
    pub fn new(admin: &'a dyn UserAdmin, policy: ExistingUserPolicy) -> Self {
        Self { admin, policy }
    }

    /// Create `credential`'s account in its target database.
    ///
    /// With [`ExistingUserPolicy::Fail`] an existing account surfaces as
    /// [`ProvisionError::DuplicateUser`]. With [`ExistingUserPolicy::Skip`]
    /// the account is looked up first and left as is if present; nothing is
    /// ever updated in place.
    pub async fn provision(
        &self,
        credential: &UserCredential,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let db = credential.target_database();
        let user = credential.username();

        if self.policy == ExistingUserPolicy::Skip {
            if let Some(existing) = self.admin.find_user(db, user).await? {
                tracing::info!(user = %user, db = %db, "user already exists, skipping");
                return Ok(ProvisionOutcome::Skipped(existing));
            }
        }

        if let Err(err) = self.admin.create_user(credential).await {
            tracing::error!(
                user = %user,
                db = %db,
                backend = self.admin.backend(),
                error_code = err.code(),
                "createUser failed"
            );
            return Err(err);
        }

        let record = match self.admin.find_user(db, user).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Err(ProvisionError::Backend(format!(
                    "user '{user}' not found in '{db}' after createUser"
                )))
            }
            // Creation succeeded; a session without viewUser cannot read it back.
            Err(err) => {
                tracing::warn!(
                    user = %user,
                    db = %db,
                    error = %err,
                    "could not read back created user"
                );
                UserRecord {
                    user: user.to_string(),
                    db: db.to_string(),
                    roles: vec![credential.role_grant()],
                }
            }
        };

        tracing::info!(
            user = %record.user,
            db = %record.db,
            role = %credential.granted_role(),
            "MongoDB user created"
        );
        Ok(ProvisionOutcome::Created(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prs_db::MemoryAdmin;
    use prs_kernel::{BuiltinRole, RoleGrant, SecretString};

    fn app_user(db: &str) -> UserCredential {
        UserCredential::new(
            "app-user",
            SecretString::from("app-pwd"),
            db,
            BuiltinRole::ReadWrite,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn creates_exactly_one_account_with_one_grant() {
        let admin = MemoryAdmin::new();
        let outcome = Provisioner::new(&admin, ExistingUserPolicy::Fail)
            .provision(&app_user("payment_registration_system"))
            .await
            .unwrap();

        assert_eq!(outcome.message(), "MongoDB user and database created.");
        assert_eq!(
            outcome.record().roles,
            vec![RoleGrant::new("readWrite", "payment_registration_system")]
        );
        assert_eq!(admin.users().await.len(), 1);
    }

    #[tokio::test]
    async fn skip_policy_reports_existing_account() {
        let admin = MemoryAdmin::new();
        let provisioner = Provisioner::new(&admin, ExistingUserPolicy::Skip);
        provisioner.provision(&app_user("db")).await.unwrap();

        let outcome = provisioner.provision(&app_user("db")).await.unwrap();
        assert!(matches!(outcome, ProvisionOutcome::Skipped(_)));
        assert_eq!(
            outcome.message(),
            "MongoDB user 'app-user' already exists in 'db'; left unchanged."
        );
    }
}

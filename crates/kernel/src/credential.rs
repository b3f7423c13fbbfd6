//! The credential data model: who gets created, where, with which role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::admin::RoleGrant;
use crate::error::ProvisionError;
use crate::secret::SecretString;

/// Database name the reference deployment provisions into.
pub const DEFAULT_DATABASE: &str = "payment_registration_system";

const ADMIN_DATABASE: &str = "admin";
const MAX_DATABASE_NAME_BYTES: usize = 63;
const FORBIDDEN_DATABASE_CHARS: &[char] =
    &['/', '\\', '.', '"', '$', '*', '<', '>', ':', '|', '?', ' ', '\0'];

/// MongoDB built-in roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltinRole {
    Read,
    #[default]
    ReadWrite,
    DbAdmin,
    DbOwner,
    UserAdmin,
    ClusterAdmin,
    ClusterManager,
    ClusterMonitor,
    HostManager,
    Backup,
    Restore,
    ReadAnyDatabase,
    ReadWriteAnyDatabase,
    UserAdminAnyDatabase,
    DbAdminAnyDatabase,
    Root,
}

impl BuiltinRole {
    pub const ALL: [BuiltinRole; 16] = [
        Self::Read,
        Self::ReadWrite,
        Self::DbAdmin,
        Self::DbOwner,
        Self::UserAdmin,
        Self::ClusterAdmin,
        Self::ClusterManager,
        Self::ClusterMonitor,
        Self::HostManager,
        Self::Backup,
        Self::Restore,
        Self::ReadAnyDatabase,
        Self::ReadWriteAnyDatabase,
        Self::UserAdminAnyDatabase,
        Self::DbAdminAnyDatabase,
        Self::Root,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadWrite => "readWrite",
            Self::DbAdmin => "dbAdmin",
            Self::DbOwner => "dbOwner",
            Self::UserAdmin => "userAdmin",
            Self::ClusterAdmin => "clusterAdmin",
            Self::ClusterManager => "clusterManager",
            Self::ClusterMonitor => "clusterMonitor",
            Self::HostManager => "hostManager",
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::ReadAnyDatabase => "readAnyDatabase",
            Self::ReadWriteAnyDatabase => "readWriteAnyDatabase",
            Self::UserAdminAnyDatabase => "userAdminAnyDatabase",
            Self::DbAdminAnyDatabase => "dbAdminAnyDatabase",
            Self::Root => "root",
        }
    }

    /// Roles MongoDB only grants on the `admin` database.
    pub fn admin_only(&self) -> bool {
        !matches!(
            self,
            Self::Read | Self::ReadWrite | Self::DbAdmin | Self::DbOwner | Self::UserAdmin
        )
    }
}

impl fmt::Display for BuiltinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltinRole {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ProvisionError::invalid(format!("'{s}' is not a built-in role")))
    }
}

/// An account to be created, with its single role grant.
#[derive(Debug, Clone)]
pub struct UserCredential {
    username: String,
    password: SecretString,
    target_database: String,
    granted_role: BuiltinRole,
}

impl UserCredential {
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        target_database: impl Into<String>,
        granted_role: BuiltinRole,
    ) -> Result<Self, ProvisionError> {
        let username = username.into();
        let target_database = target_database.into();

        validate_username(&username)?;
        validate_database_name(&target_database)?;
        if password.expose().is_empty() {
            return Err(ProvisionError::invalid("password must not be empty"));
        }
        if granted_role.admin_only() && target_database != ADMIN_DATABASE {
            return Err(ProvisionError::invalid(format!(
                "role '{granted_role}' can only be granted on the '{ADMIN_DATABASE}' database, not '{target_database}'"
            )));
        }

        Ok(Self {
            username,
            password,
            target_database,
            granted_role,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn target_database(&self) -> &str {
        &self.target_database
    }

    pub fn granted_role(&self) -> BuiltinRole {
        self.granted_role
    }

    /// The grant is always scoped to the database the user is created in.
    pub fn role_grant(&self) -> RoleGrant {
        RoleGrant::new(self.granted_role.as_str(), &self.target_database)
    }
}

pub fn validate_username(username: &str) -> Result<(), ProvisionError> {
    if username.is_empty() {
        return Err(ProvisionError::invalid("username must not be empty"));
    }
    if username.contains('\0') {
        return Err(ProvisionError::invalid("username must not contain NUL"));
    }
    Ok(())
}

pub fn validate_database_name(name: &str) -> Result<(), ProvisionError> {
    if name.is_empty() {
        return Err(ProvisionError::invalid("database name must not be empty"));
    }
    if name.len() > MAX_DATABASE_NAME_BYTES {
        return Err(ProvisionError::invalid(format!(
            "database name '{name}' exceeds {MAX_DATABASE_NAME_BYTES} bytes"
        )));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
        return Err(ProvisionError::invalid(format!(
            "database name '{name}' contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(db: &str, role: BuiltinRole) -> Result<UserCredential, ProvisionError> {
        UserCredential::new("app-user", SecretString::from("app-pwd"), db, role)
    }

    #[test]
    fn role_grant_is_scoped_to_target_database() {
        let cred = credential(DEFAULT_DATABASE, BuiltinRole::ReadWrite).unwrap();
        assert_eq!(
            cred.role_grant(),
            RoleGrant::new("readWrite", "payment_registration_system")
        );
    }

    #[test]
    fn role_names_round_trip_through_from_str() {
        for role in BuiltinRole::ALL {
            assert_eq!(role.as_str().parse::<BuiltinRole>().unwrap(), role);
        }
        assert!("readwrite".parse::<BuiltinRole>().is_err());
        assert!("superuser".parse::<BuiltinRole>().is_err());
    }

    #[test]
    fn role_deserializes_from_camel_case() {
        let role: BuiltinRole = serde_json::from_str("\"readWriteAnyDatabase\"").unwrap();
        assert_eq!(role, BuiltinRole::ReadWriteAnyDatabase);
    }

    #[test]
    fn admin_only_roles_are_rejected_outside_admin() {
        let err = credential(DEFAULT_DATABASE, BuiltinRole::Root).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidCredential(_)));
        assert!(credential("admin", BuiltinRole::Root).is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(UserCredential::new(
            "",
            SecretString::from("pwd"),
            DEFAULT_DATABASE,
            BuiltinRole::Read
        )
        .is_err());
        assert!(credential("", BuiltinRole::Read).is_err());
        assert!(credential("payments.v2", BuiltinRole::Read).is_err());
        assert!(credential("pay ments", BuiltinRole::Read).is_err());
        assert!(credential(&"x".repeat(64), BuiltinRole::Read).is_err());
        assert!(credential(&"x".repeat(63), BuiltinRole::Read).is_ok());
    }

    #[test]
    fn rejects_empty_password() {
        let err = UserCredential::new(
            "app-user",
            SecretString::from(""),
            DEFAULT_DATABASE,
            BuiltinRole::ReadWrite,
        )
        .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn debug_output_hides_password() {
        let cred = credential(DEFAULT_DATABASE, BuiltinRole::ReadWrite).unwrap();
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("app-pwd"));
        assert!(rendered.contains("app-user"));
    }
}

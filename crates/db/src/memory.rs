use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use prs_kernel::{ProvisionError, SecretString, UserAdmin, UserCredential, UserRecord};

struct StoredUser {
    record: UserRecord,
    password: SecretString,
}

struct State {
    reachable: bool,
    can_create_users: bool,
    // keyed by (db, user)
    users: BTreeMap<(String, String), StoredUser>,
    collections: BTreeMap<String, BTreeSet<String>>,
}

/// In-process authentication namespace.
///
/// Behaves like a single MongoDB instance for the operations the provisioner
/// uses, including duplicate detection, missing privilege and an unreachable
/// instance.
pub struct MemoryAdmin {
    state: Mutex<State>,
}

impl MemoryAdmin {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                reachable: true,
                can_create_users: true,
                users: BTreeMap::new(),
                collections: BTreeMap::new(),
            }),
        }
    }

    /// Session that lacks the `createUser` privilege.
    pub fn without_user_admin_privilege(mut self) -> Self {
        self.state.get_mut().can_create_users = false;
        self
    }

    /// Seed collections into `db`.
    pub fn with_collections(mut self, db: &str, collections: &[&str]) -> Self {
        self.state
            .get_mut()
            .collections
            .entry(db.to_string())
            .or_default()
            .extend(collections.iter().map(|c| c.to_string()));
        self
    }

    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.reachable = reachable;
    }

    /// Every account in the namespace, ordered by database then user.
    pub async fn users(&self) -> Vec<UserRecord> {
        self.state
            .lock()
            .await
            .users
            .values()
            .map(|stored| stored.record.clone())
            .collect()
    }

    pub async fn verify_password(&self, db: &str, user: &str, password: &str) -> bool {
        self.state
            .lock()
            .await
            .users
            .get(&(db.to_string(), user.to_string()))
            .is_some_and(|stored| stored.password.expose() == password)
    }
}

impl Default for MemoryAdmin {
    fn default() -> Self {
        Self::new()
    }
}

fn unreachable() -> ProvisionError {
    ProvisionError::ConnectionFailure("in-memory instance is unreachable".to_string())
}

#[async_trait]
impl UserAdmin for MemoryAdmin {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self, _db: &str) -> Result<(), ProvisionError> {
        if !self.state.lock().await.reachable {
            return Err(unreachable());
        }
        Ok(())
    }

    async fn find_user(&self, db: &str, user: &str) -> Result<Option<UserRecord>, ProvisionError> {
        let state = self.state.lock().await;
        if !state.reachable {
            return Err(unreachable());
        }
        Ok(state
            .users
            .get(&(db.to_string(), user.to_string()))
            .map(|stored| stored.record.clone()))
    }

    async fn create_user(&self, credential: &UserCredential) -> Result<(), ProvisionError> {
        let mut state = self.state.lock().await;
        if !state.reachable {
            return Err(unreachable());
        }
        if !state.can_create_users {
            return Err(ProvisionError::PermissionDenied(format!(
                "not authorized on {} to execute command createUser",
                credential.target_database()
            )));
        }

        let key = (
            credential.target_database().to_string(),
            credential.username().to_string(),
        );
        if state.users.contains_key(&key) {
            return Err(ProvisionError::duplicate_user(
                credential.username(),
                credential.target_database(),
            ));
        }

        let record = UserRecord {
            user: credential.username().to_string(),
            db: credential.target_database().to_string(),
            roles: vec![credential.role_grant()],
        };
        state.users.insert(
            key,
            StoredUser {
                record,
                password: credential.password().clone(),
            },
        );
        Ok(())
    }

    async fn list_collections(&self, db: &str) -> Result<Vec<String>, ProvisionError> {
        let state = self.state.lock().await;
        if !state.reachable {
            return Err(unreachable());
        }
        Ok(state
            .collections
            .get(db)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), ProvisionError> {
        let mut state = self.state.lock().await;
        if !state.reachable {
            return Err(unreachable());
        }
        if let Some(set) = state.collections.get_mut(db) {
            set.remove(collection);
        }
        Ok(())
    }
}

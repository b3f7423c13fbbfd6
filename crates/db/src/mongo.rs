use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde::Deserialize;

use prs_kernel::settings::MongoSettings;
use prs_kernel::{ProvisionError, UserAdmin, UserCredential, UserRecord};

/// Server error code for `createUser` on an existing account.
const USER_ALREADY_EXISTS: i32 = 51003;
const UNAUTHORIZED: i32 = 13;
const AUTHENTICATION_FAILED: i32 = 18;

/// Administrative session backed by the MongoDB driver.
pub struct MongoAdmin {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct UsersInfoReply {
    #[serde(default)]
    users: Vec<UserRecord>,
}

impl MongoAdmin {
    /// Build a client from settings. The driver connects lazily; use
    /// [`UserAdmin::ping`] to verify the instance is reachable.
    pub async fn connect(settings: &MongoSettings) -> Result<Self, ProvisionError> {
        let mut options = ClientOptions::parse(settings.uri.as_str())
            .await
            .map_err(map_error)?;

        let timeout = Duration::from_millis(settings.connect_timeout_ms);
        options.app_name = Some(settings.app_name.clone());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let hosts: Vec<String> = options.hosts.iter().map(ToString::to_string).collect();
        tracing::info!(
            hosts = ?hosts,
            app_name = %settings.app_name,
            timeout_ms = settings.connect_timeout_ms,
            "creating MongoDB client"
        );

        let client = Client::with_options(options).map_err(map_error)?;
        Ok(Self { client })
    }

    /// Close the client, waiting for in-flight operations.
    pub async fn close(self) {
        self.client.shutdown().await;
        tracing::info!("MongoDB connection closed");
    }
}

#[async_trait]
impl UserAdmin for MongoAdmin {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self, db: &str) -> Result<(), ProvisionError> {
        self.client
            .database(db)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(map_error)?;
        tracing::info!(db = %db, "connected to MongoDB");
        Ok(())
    }

    async fn find_user(&self, db: &str, user: &str) -> Result<Option<UserRecord>, ProvisionError> {
        let reply = self
            .client
            .database(db)
            .run_command(doc! { "usersInfo": { "user": user, "db": db } })
            .await
            .map_err(map_error)?;

        let reply: UsersInfoReply = mongodb::bson::from_document(reply)
            .map_err(|e| ProvisionError::Backend(format!("malformed usersInfo reply: {e}")))?;

        Ok(reply
            .users
            .into_iter()
            .find(|record| record.user == user && record.db == db))
    }

    async fn create_user(&self, credential: &UserCredential) -> Result<(), ProvisionError> {
        let grant = credential.role_grant();
        let command = doc! {
            "createUser": credential.username(),
            "pwd": credential.password().expose().as_str(),
            "roles": [ { "role": grant.role.as_str(), "db": grant.db.as_str() } ],
        };

        self.client
            .database(credential.target_database())
            .run_command(command)
            .await
            .map_err(|err| map_create_user_error(err, credential))?;

        Ok(())
    }

    async fn list_collections(&self, db: &str) -> Result<Vec<String>, ProvisionError> {
        self.client
            .database(db)
            .list_collection_names()
            .await
            .map_err(map_error)
    }

    async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), ProvisionError> {
        self.client
            .database(db)
            .collection::<Document>(collection)
            .drop()
            .await
            .map_err(map_error)
    }
}

fn command_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

fn map_create_user_error(err: MongoError, credential: &UserCredential) -> ProvisionError {
    match command_code(&err) {
        Some(USER_ALREADY_EXISTS) => {
            ProvisionError::duplicate_user(credential.username(), credential.target_database())
        }
        _ => map_error(err),
    }
}

/// Map a driver error onto the provisioning taxonomy.
fn map_error(err: MongoError) -> ProvisionError {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => match command.code {
            UNAUTHORIZED | AUTHENTICATION_FAILED => {
                ProvisionError::PermissionDenied(command.message.clone())
            }
            _ => ProvisionError::Backend(err.to_string()),
        },
        ErrorKind::Authentication { .. } => ProvisionError::PermissionDenied(err.to_string()),
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => {
            ProvisionError::ConnectionFailure(err.to_string())
        }
        _ => ProvisionError::Backend(err.to_string()),
    }
}

pub mod admin;
pub mod credential;
pub mod error;
pub mod registry;
pub mod secret;
pub mod settings;
pub mod step;

pub use admin::{RoleGrant, UserAdmin, UserRecord};
pub use credential::{BuiltinRole, UserCredential};
pub use error::{ProvisionError, SecretError};
pub use registry::{StepRegistry, StepReport};
pub use secret::{EnvSecretStore, Secret, SecretStore, SecretString, REDACTED};
pub use settings::{ExistingUserPolicy, Settings};
pub use step::{Step, StepCtx, StepOutcome};

pub mod clean;
pub mod ping;
pub mod user;

use std::sync::Arc;

use prs_kernel::{ExistingUserPolicy, StepRegistry, UserCredential};

pub use clean::CleanStep;
pub use ping::PingStep;
pub use user::UserStep;

/// Register the provisioning pipeline with the registry
pub fn register_all(
    registry: &mut StepRegistry,
    credential: UserCredential,
    policy: ExistingUserPolicy,
) -> anyhow::Result<()> {
    registry.register(Arc::new(PingStep::new()))?;
    registry.register(Arc::new(CleanStep::new()))?;
    registry.register(Arc::new(UserStep::new(credential, policy)))?;
    Ok(())
}

use async_trait::async_trait;
use prs_kernel::{ExistingUserPolicy, Step, StepCtx, StepOutcome, UserCredential};

use crate::provisioner::Provisioner;

/// Creates the application account
pub struct UserStep {
    credential: UserCredential,
    policy: ExistingUserPolicy,
}

impl UserStep {
    /// The credential is resolved up front so that a missing secret fails
    /// before any connection is made.
    pub fn new(credential: UserCredential, policy: ExistingUserPolicy) -> Self {
        Self { credential, policy }
    }
}

#[async_trait]
impl Step for UserStep {
    fn name(&self) -> &'static str {
        "user"
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> anyhow::Result<StepOutcome> {
        let outcome = Provisioner::new(ctx.admin, self.policy)
            .provision(&self.credential)
            .await?;
        Ok(StepOutcome::with_message(outcome.message()))
    }
}

use async_trait::async_trait;
use prs_kernel::{Step, StepCtx, StepOutcome};

/// Verifies the instance answers before anything is mutated
pub struct PingStep;

impl PingStep {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for PingStep {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> anyhow::Result<StepOutcome> {
        ctx.admin.ping(&ctx.settings.mongo.database).await?;
        tracing::info!(
            step = self.name(),
            backend = ctx.admin.backend(),
            environment = ?ctx.settings.environment,
            "instance reachable"
        );
        Ok(StepOutcome::done())
    }
}

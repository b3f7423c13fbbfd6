use async_trait::async_trait;

use crate::admin::UserAdmin;
use crate::settings::Settings;

/// Context provided to steps while the pipeline runs
pub struct StepCtx<'a> {
    pub settings: &'a Settings,
    pub admin: &'a dyn UserAdmin,
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran. `message` is printed for the operator when present.
    Completed { message: Option<String> },
    /// The step had nothing to do.
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn done() -> Self {
        Self::Completed { message: None }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self::Completed {
            message: Some(message.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// A named unit of the provisioning pipeline
#[async_trait]
pub trait Step: Sync + Send {
    /// Unique name for this step
    fn name(&self) -> &'static str;

    /// Execute the step. The first error aborts the pipeline.
    async fn run(&self, ctx: &StepCtx<'_>) -> anyhow::Result<StepOutcome>;
}

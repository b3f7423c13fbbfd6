use async_trait::async_trait;
use prs_kernel::{Step, StepCtx, StepOutcome};

/// Drops every collection in the target database when `mongo.clean` is set
pub struct CleanStep;

impl CleanStep {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for CleanStep {
    fn name(&self) -> &'static str {
        "clean"
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> anyhow::Result<StepOutcome> {
        if !ctx.settings.mongo.clean {
            return Ok(StepOutcome::skipped("mongo.clean is disabled"));
        }

        let db = &ctx.settings.mongo.database;
        tracing::info!(db = %db, "cleaning the database: dropping existing collections");

        let collections = ctx.admin.list_collections(db).await?;
        for collection in &collections {
            ctx.admin.drop_collection(db, collection).await?;
            tracing::info!(db = %db, collection = %collection, "dropped collection");
        }

        Ok(StepOutcome::with_message(format!(
            "Dropped {} collection(s) from '{}'.",
            collections.len(),
            db
        )))
    }
}

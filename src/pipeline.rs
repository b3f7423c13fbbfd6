//! End-to-end provisioning run shared by both binaries.

use anyhow::Context;
use prs_db::MongoAdmin;
use prs_kernel::{
    ProvisionError, SecretStore, Settings, StepCtx, StepOutcome, StepRegistry, StepReport,
    UserAdmin, UserCredential,
};

use crate::steps;

/// Acquire the password and build the credential for the configured database.
pub fn resolve_credential(
    settings: &Settings,
    secrets: &dyn SecretStore,
) -> anyhow::Result<UserCredential> {
    settings
        .credential
        .resolve(&settings.mongo.database, secrets)
        .with_context(|| {
            format!(
                "failed to prepare credential for user '{}'",
                settings.credential.username
            )
        })
}

/// Run ping, clean and user creation against `admin`.
///
/// Ping and clean act on `settings.mongo.database`, so the credential must
/// target that same database.
pub async fn run(
    settings: &Settings,
    admin: &dyn UserAdmin,
    credential: UserCredential,
) -> anyhow::Result<Vec<StepReport>> {
    if credential.target_database() != settings.mongo.database {
        return Err(ProvisionError::invalid(format!(
            "credential targets database '{}' but the pipeline is configured for '{}'",
            credential.target_database(),
            settings.mongo.database
        ))
        .into());
    }

    let mut registry = StepRegistry::new();
    steps::register_all(&mut registry, credential, settings.credential.on_existing)?;

    let ctx = StepCtx { settings, admin };
    registry.run_all(&ctx).await
}

/// Resolve the credential, connect to MongoDB and run the pipeline.
///
/// The secret is resolved before any connection is opened. The client is
/// closed whether or not the run succeeds.
pub async fn provision_with(
    settings: &Settings,
    secrets: &dyn SecretStore,
) -> anyhow::Result<Vec<StepReport>> {
    let credential = resolve_credential(settings, secrets)?;
    let admin = MongoAdmin::connect(&settings.mongo)
        .await
        .with_context(|| "failed to create MongoDB client")?;

    let result = run(settings, &admin, credential).await;
    admin.close().await;

    result.inspect_err(|err| {
        tracing::error!(error_code = error_code(err), "provisioning failed: {err:#}");
    })
}

/// Messages the steps want shown to the operator, in pipeline order.
pub fn operator_messages(reports: &[StepReport]) -> Vec<&str> {
    reports
        .iter()
        .filter_map(|report| match &report.outcome {
            StepOutcome::Completed { message } => message.as_deref(),
            StepOutcome::Skipped { .. } => None,
        })
        .collect()
}

/// Stable code for a failed run, for structured logs.
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<ProvisionError>()
        .map(ProvisionError::code)
        .unwrap_or("internal_error")
}

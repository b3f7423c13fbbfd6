use anyhow::Context;
use prs_kernel::{EnvSecretStore, Settings};
use prs_provision::pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load PRS settings")?;
    prs_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.mongo.database,
        user = %settings.credential.username,
        "prs-provision starting"
    );

    let reports = pipeline::provision_with(&settings, &EnvSecretStore::new()).await?;
    for message in pipeline::operator_messages(&reports) {
        println!("{message}");
    }

    tracing::info!("prs-provision complete");
    Ok(())
}

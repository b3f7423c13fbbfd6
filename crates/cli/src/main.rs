use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};

use prs_db::MongoAdmin;
use prs_kernel::credential::validate_database_name;
use prs_kernel::{
    BuiltinRole, EnvSecretStore, ExistingUserPolicy, Settings, StepCtx, StepRegistry, UserAdmin,
};
use prs_provision::pipeline;
use prs_provision::steps::{CleanStep, PingStep};

#[derive(Debug, Parser)]
#[command(
    name = "prs",
    version,
    about = "Provision the Payment Registration System MongoDB user"
)]
struct Cli {
    /// Directory holding base.toml and <env>.toml (defaults to $PRS_CONFIG_DIR or ./config)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Deployment environment: local, staging or production (defaults to $PRS_ENV)
    #[arg(long = "env", global = true, value_name = "ENV")]
    environment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the application user with its role grant
    Provision(ProvisionArgs),
    /// Check that the instance is reachable
    Check,
    /// Drop every collection in the target database
    Clean {
        #[arg(long)]
        database: Option<String>,
        /// Confirm the drop
        #[arg(long)]
        yes: bool,
    },
    /// Show an account and its role grants as JSON
    Show {
        #[arg(long)]
        username: String,
        #[arg(long)]
        database: Option<String>,
    },
}

#[derive(Debug, Args)]
struct ProvisionArgs {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    database: Option<String>,
    #[arg(long, value_parser = parse_role)]
    role: Option<BuiltinRole>,
    /// Secret name holding the password (read from $VAR or the file in $VAR_FILE)
    #[arg(long, value_name = "VAR")]
    password_env: Option<String>,
    /// Leave an existing account untouched instead of failing
    #[arg(long)]
    if_missing: bool,
    /// Drop every collection in the target database first
    #[arg(long)]
    clean: bool,
}

impl ProvisionArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(username) = self.username {
            settings.credential.username = username;
        }
        if let Some(database) = self.database {
            settings.mongo.database = database;
        }
        if let Some(role) = self.role {
            settings.credential.role = role;
        }
        if let Some(password_env) = self.password_env {
            settings.credential.password_env = password_env;
        }
        if self.if_missing {
            settings.credential.on_existing = ExistingUserPolicy::Skip;
        }
        if self.clean {
            settings.mongo.clean = true;
        }
    }
}

fn parse_role(value: &str) -> Result<BuiltinRole, String> {
    value.parse().map_err(|err: prs_kernel::ProvisionError| err.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_with(cli.config_dir, cli.environment)
        .with_context(|| "failed to load PRS settings")?;
    prs_telemetry::init(&settings.telemetry)?;

    tracing::debug!(env = ?settings.environment, "prs cli starting");

    match cli.command {
        Command::Provision(args) => {
            args.apply(&mut settings);
            provision(&settings).await
        }
        Command::Check => check(&settings).await,
        Command::Clean { database, yes } => {
            if !yes {
                bail!("refusing to drop collections without --yes");
            }
            if let Some(database) = database {
                settings.mongo.database = database;
            }
            settings.mongo.clean = true;
            clean(&settings).await
        }
        Command::Show { username, database } => {
            let database = database.unwrap_or_else(|| settings.mongo.database.clone());
            show(&settings, &username, &database).await
        }
    }
}

async fn connect(settings: &Settings) -> anyhow::Result<MongoAdmin> {
    MongoAdmin::connect(&settings.mongo)
        .await
        .with_context(|| "failed to create MongoDB client")
}

async fn provision(settings: &Settings) -> anyhow::Result<()> {
    let reports = pipeline::provision_with(settings, &EnvSecretStore::new()).await?;
    for message in pipeline::operator_messages(&reports) {
        println!("{message}");
    }
    Ok(())
}

async fn check(settings: &Settings) -> anyhow::Result<()> {
    let admin = connect(settings).await?;
    let result = admin.ping(&settings.mongo.database).await;
    admin.close().await;

    result.with_context(|| "MongoDB is not reachable")?;
    println!(
        "MongoDB is reachable (database '{}').",
        settings.mongo.database
    );
    Ok(())
}

async fn clean(settings: &Settings) -> anyhow::Result<()> {
    validate_database_name(&settings.mongo.database)?;
    let admin = connect(settings).await?;

    let mut registry = StepRegistry::new();
    registry.register(Arc::new(PingStep::new()))?;
    registry.register(Arc::new(CleanStep::new()))?;

    let ctx = StepCtx {
        settings,
        admin: &admin,
    };
    let result = registry.run_all(&ctx).await;
    admin.close().await;

    for message in pipeline::operator_messages(&result?) {
        println!("{message}");
    }
    Ok(())
}

async fn show(settings: &Settings, username: &str, database: &str) -> anyhow::Result<()> {
    validate_database_name(database)?;
    let admin = connect(settings).await?;
    let result = admin.find_user(database, username).await;
    admin.close().await;

    let record = result
        .with_context(|| format!("failed to look up user '{username}'"))?
        .ok_or_else(|| anyhow!("user '{username}' not found in database '{database}'"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

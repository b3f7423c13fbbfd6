use anyhow::{bail, Context};
use std::sync::Arc;

use crate::step::{Step, StepCtx, StepOutcome};

/// Pipeline order for the built-in steps
pub const STEP_ORDER: &[&str] = &[
    "ping",  // Fail fast when the instance is unreachable
    "clean", // Optional collection drop
    "user",  // Account creation
];

/// What a step reported once it finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: &'static str,
    pub outcome: StepOutcome,
}

/// Step registry running the provisioning pipeline in a fixed order
pub struct StepRegistry {
    steps: Vec<Arc<dyn Step>>,
}

impl StepRegistry {
    /// Create a new step registry
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Register a step with the registry. Step names must be unique.
    pub fn register(&mut self, step: Arc<dyn Step>) -> anyhow::Result<()> {
        if self.get_step(step.name()).is_some() {
            bail!("step '{}' is already registered", step.name());
        }
        self.steps.push(step);
        Ok(())
    }

    /// Get a step by name
    pub fn get_step(&self, name: &str) -> Option<&Arc<dyn Step>> {
        self.steps.iter().find(|step| step.name() == name)
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in execution order: built-ins per [`STEP_ORDER`], then any
    /// others in registration order.
    pub fn ordered(&self) -> Vec<&Arc<dyn Step>> {
        let mut ordered: Vec<&Arc<dyn Step>> = STEP_ORDER
            .iter()
            .filter_map(|&name| self.get_step(name))
            .collect();
        ordered.extend(
            self.steps
                .iter()
                .filter(|step| !STEP_ORDER.contains(&step.name())),
        );
        ordered
    }

    /// Run every step, stopping at the first failure.
    pub async fn run_all(&self, ctx: &StepCtx<'_>) -> anyhow::Result<Vec<StepReport>> {
        let ordered = self.ordered();
        let names: Vec<&'static str> = ordered.iter().map(|step| step.name()).collect();
        tracing::info!("running provisioning steps in order: {:?}", names);

        let mut reports = Vec::with_capacity(ordered.len());
        for step in ordered {
            tracing::info!(step = step.name(), "running step");

            let outcome = step
                .run(ctx)
                .await
                .with_context(|| format!("step '{}' failed", step.name()))?;

            match &outcome {
                StepOutcome::Completed { .. } => {
                    tracing::info!(step = step.name(), "step completed")
                }
                StepOutcome::Skipped { reason } => {
                    tracing::info!(step = step.name(), reason = %reason, "step skipped")
                }
            }

            reports.push(StepReport {
                step: step.name(),
                outcome,
            });
        }

        Ok(reports)
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{UserAdmin, UserRecord};
    use crate::credential::UserCredential;
    use crate::error::ProvisionError;
    use crate::settings::Settings;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct NullAdmin;

    #[async_trait]
    impl UserAdmin for NullAdmin {
        fn backend(&self) -> &'static str {
            "null"
        }

        async fn ping(&self, _db: &str) -> Result<(), ProvisionError> {
            Ok(())
        }

        async fn find_user(
            &self,
            _db: &str,
            _user: &str,
        ) -> Result<Option<UserRecord>, ProvisionError> {
            Ok(None)
        }

        async fn create_user(&self, _credential: &UserCredential) -> Result<(), ProvisionError> {
            Ok(())
        }

        async fn list_collections(&self, _db: &str) -> Result<Vec<String>, ProvisionError> {
            Ok(vec![])
        }

        async fn drop_collection(&self, _db: &str, _collection: &str) -> Result<(), ProvisionError> {
            Ok(())
        }
    }

    struct RecordingStep {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl Step for RecordingStep {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _ctx: &StepCtx<'_>) -> anyhow::Result<StepOutcome> {
            self.log.lock().await.push(self.name);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(StepOutcome::done())
        }
    }

    fn step(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn Step> {
        Arc::new(RecordingStep {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn test_step_registry_creation() {
        let registry = StepRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn duplicate_step_names_are_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = StepRegistry::new();
        registry.register(step("clean", &log, false)).unwrap();

        let err = registry.register(step("clean", &log, true)).unwrap_err();
        assert_eq!(err.to_string(), "step 'clean' is already registered");
        assert_eq!(registry.len(), 1);

        let settings = Settings::default();
        let ctx = StepCtx {
            settings: &settings,
            admin: &NullAdmin,
        };
        registry.run_all(&ctx).await.unwrap();
        assert_eq!(*log.lock().await, vec!["clean"]);
    }

    #[tokio::test]
    async fn runs_built_in_steps_in_pipeline_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = StepRegistry::new();
        registry.register(step("user", &log, false)).unwrap();
        registry.register(step("audit", &log, false)).unwrap();
        registry.register(step("ping", &log, false)).unwrap();
        registry.register(step("clean", &log, false)).unwrap();
        assert_eq!(registry.len(), 4);

        let settings = Settings::default();
        let ctx = StepCtx {
            settings: &settings,
            admin: &NullAdmin,
        };

        let reports = registry.run_all(&ctx).await.unwrap();
        assert_eq!(*log.lock().await, vec!["ping", "clean", "user", "audit"]);
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].step, "ping");
    }

    #[tokio::test]
    async fn first_failure_stops_the_pipeline_with_step_context() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = StepRegistry::new();
        registry.register(step("ping", &log, false)).unwrap();
        registry.register(step("clean", &log, true)).unwrap();
        registry.register(step("user", &log, false)).unwrap();

        let settings = Settings::default();
        let ctx = StepCtx {
            settings: &settings,
            admin: &NullAdmin,
        };

        let err = registry.run_all(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "step 'clean' failed");
        assert_eq!(*log.lock().await, vec!["ping", "clean"]);
    }
}

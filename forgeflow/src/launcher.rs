//! The build launcher: the editor-facing path from a stored definition to
//! a running build.
//!
//! Loads the definition, validates it, compiles it, and hands the YAML
//! spec text to the build trigger with retry. This path never touches the
//! execution graph; that is the engine's side of the house.

use crate::compiler::compile;
use crate::errors::ForgeflowError;
use crate::store::PipelineStore;
use crate::triggers::{with_retry, BuildStarted, BuildTrigger, RetryConfig};
use crate::validate::validate_definition;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Starts builds from stored pipeline definitions.
#[derive(Debug, Clone)]
pub struct BuildLauncher {
    store: Arc<dyn PipelineStore>,
    trigger: Arc<dyn BuildTrigger>,
    retry: RetryConfig,
}

impl BuildLauncher {
    /// Creates a launcher with the default retry configuration.
    #[must_use]
    pub fn new(store: Arc<dyn PipelineStore>, trigger: Arc<dyn BuildTrigger>) -> Self {
        Self {
            store,
            trigger,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the retry configuration used for the trigger call.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Compiles the pipeline's definition and starts a build of
    /// `project_ref` from it.
    ///
    /// Validation failures surface here, before anything reaches the
    /// build service.
    pub async fn start_build(
        &self,
        pipeline_id: &str,
        project_ref: &str,
        env_overrides: &BTreeMap<String, String>,
    ) -> Result<BuildStarted, ForgeflowError> {
        let definition = self.store.load_definition(pipeline_id).await?;
        validate_definition(&definition)?;

        let spec_text = compile(&definition).to_yaml()?;
        tracing::info!(
            pipeline = pipeline_id,
            project = project_ref,
            spec_bytes = spec_text.len(),
            "compiled pipeline definition; starting build"
        );

        let started = with_retry(&self.retry, &format!("launch:{pipeline_id}"), || {
            self.trigger
                .start_build(project_ref, &spec_text, env_overrides)
        })
        .await?;

        tracing::info!(
            pipeline = pipeline_id,
            build_id = %started.build_id,
            "build started"
        );
        Ok(started)
    }
}

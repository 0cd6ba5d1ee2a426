//! External collaborator connectors
//!
//! The engine never talks to the check catalog, the inspection service or the
//! remediation service directly. Each one sits behind a trait so that routes,
//! the scheduler and tests can swap implementations.
//!
//! ## Architecture Pattern
//!
//! 1. Define the trait here → allows mocking in tests
//! 2. Implement the HTTP/file client in its own module
//! 3. Configuration in `configuration.rs` → base URLs, timeouts, retries
//! 4. Inject `Arc<dyn Trait>` into the engine → the engine never depends on HTTP details

pub mod client;
pub mod errors;
pub mod registry;
pub mod remediation;
pub mod runner;

pub use client::CollaboratorClient;
pub use errors::{ConnectorError, RegistryError};
pub use registry::{FileCheckRegistry, StaticCheckRegistry};
pub use remediation::HttpRemediator;
pub use runner::{CheckResponse, HttpCheckRunner};

use crate::configuration::CollaboratorSettings;
use crate::health::{CheckCatalog, CheckExecutionError, HealthCheckDefinition, RawCheckOutput};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Supplies the ordered set of check definitions. Reloaded at every run.
#[async_trait]
pub trait CheckRegistry: Send + Sync {
    async fn load(&self) -> Result<CheckCatalog, RegistryError>;
}

/// Performs the actual inspection behind one check.
#[async_trait]
pub trait CheckRunner: Send + Sync {
    async fn run(
        &self,
        definition: &HealthCheckDefinition,
    ) -> Result<RawCheckOutput, CheckExecutionError>;
}

/// Applies the automated fix for one check and returns a human readable summary.
#[async_trait]
pub trait Remediator: Send + Sync {
    async fn remediate(&self, check_id: &str) -> Result<String, ConnectorError>;
}

/// Builds the HTTP collaborators from settings.
pub fn init_http_collaborators(
    settings: &CollaboratorSettings,
) -> Result<(Arc<dyn CheckRunner>, Arc<dyn Remediator>), ConnectorError> {
    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let auth_token = std::env::var("COLLABORATOR_AUTH_TOKEN").ok();

    let check_client = CollaboratorClient::new(
        &settings.check_url,
        timeout,
        settings.retry_attempts,
        auth_token.clone(),
    )?;
    let remediation_client = CollaboratorClient::new(
        &settings.remediation_url,
        timeout,
        // Remediation is not idempotent in general, never retry it.
        1,
        auth_token,
    )?;

    tracing::info!(
        check_url = %settings.check_url,
        remediation_url = %settings.remediation_url,
        "Collaborator connectors initialized"
    );

    Ok((
        Arc::new(HttpCheckRunner::new(check_client)),
        Arc::new(HttpRemediator::new(remediation_client)),
    ))
}

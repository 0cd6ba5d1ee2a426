use super::errors::RegistryError;
use super::CheckRegistry;
use crate::health::CheckCatalog;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Rejects catalogs the engine cannot score unambiguously.
pub fn validate_catalog(catalog: &CheckCatalog) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    for check in &catalog.checks {
        if check.id.trim().is_empty() {
            return Err(RegistryError::Invalid("check with empty id".to_string()));
        }
        if !seen.insert(check.id.as_str()) {
            return Err(RegistryError::Invalid(format!(
                "duplicate check id '{}'",
                check.id
            )));
        }
    }
    Ok(())
}

/// Reads the catalog from a YAML file on every load, so edits apply on the
/// next run without a restart.
pub struct FileCheckRegistry {
    path: PathBuf,
}

impl FileCheckRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CheckRegistry for FileCheckRegistry {
    #[tracing::instrument(name = "Load check catalog", skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<CheckCatalog, RegistryError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RegistryError::Io {
                path: self.path.clone(),
                source,
            })?;
        let catalog: CheckCatalog = serde_yaml::from_str(&raw)?;
        validate_catalog(&catalog)?;

        tracing::debug!(checks = catalog.checks.len(), "Catalog loaded");
        Ok(catalog)
    }
}

/// In-memory catalog for embedding the engine; can be swapped at runtime.
#[derive(Default)]
pub struct StaticCheckRegistry {
    catalog: RwLock<CheckCatalog>,
}

impl StaticCheckRegistry {
    pub fn new(catalog: CheckCatalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    pub async fn replace(&self, catalog: CheckCatalog) {
        *self.catalog.write().await = catalog;
    }
}

#[async_trait]
impl CheckRegistry for StaticCheckRegistry {
    async fn load(&self) -> Result<CheckCatalog, RegistryError> {
        let catalog = self.catalog.read().await.clone();
        validate_catalog(&catalog)?;
        Ok(catalog)
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use platform_health::connectors::{
    CheckRegistry, CheckRunner, ConnectorError, RegistryError, Remediator, StaticCheckRegistry,
};
use platform_health::health::{
    CheckCatalog, CheckExecutionError, EngineOptions, HealthCheckDefinition, HealthEngine,
    RawCheckOutput,
};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub enum Script {
    Score(f64),
    Fail(String),
    Sleep(Duration, f64),
}

/// Answers checks from a mutable script and records peak concurrency.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, Script>>,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ScriptedRunner {
    pub fn with_scores(scores: &[(&str, f64)]) -> Self {
        let runner = Self::default();
        for (id, score) in scores {
            runner.set(id, Script::Score(*score));
        }
        runner
    }

    pub fn set(&self, id: &str, script: Script) {
        self.scripts.lock().unwrap().insert(id.to_string(), script);
    }
}

#[async_trait]
impl CheckRunner for ScriptedRunner {
    async fn run(
        &self,
        definition: &HealthCheckDefinition,
    ) -> Result<RawCheckOutput, CheckExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let script = self.scripts.lock().unwrap().get(&definition.id).cloned();
        let result = match script {
            Some(Script::Score(score)) => Ok(RawCheckOutput::new(score, format!("{} evaluated", definition.name))),
            Some(Script::Fail(reason)) => Err(CheckExecutionError::Failed(reason)),
            Some(Script::Sleep(duration, score)) => {
                tokio::time::sleep(duration).await;
                Ok(RawCheckOutput::new(score, "slow"))
            }
            None => Err(CheckExecutionError::Unavailable("no script".to_string())),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Blocks every remediation until released; counts invocations.
pub struct GatedRemediator {
    pub calls: AtomicUsize,
    pub release: Notify,
    pub fail_with: Mutex<Option<String>>,
}

impl GatedRemediator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            release: Notify::new(),
            fail_with: Mutex::new(None),
        }
    }

    pub fn failing(reason: &str) -> Self {
        let remediator = Self::new();
        *remediator.fail_with.lock().unwrap() = Some(reason.to_string());
        remediator
    }
}

#[async_trait]
impl Remediator for GatedRemediator {
    async fn remediate(&self, check_id: &str) -> Result<String, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        let failure = self.fail_with.lock().unwrap().clone();
        match failure {
            Some(reason) => Err(ConnectorError::Internal(reason)),
            None => Ok(format!("{} remediated", check_id)),
        }
    }
}

/// Static catalog that can be switched into a failing state.
pub struct ToggleRegistry {
    inner: StaticCheckRegistry,
    pub failing: AtomicBool,
}

impl ToggleRegistry {
    pub fn new(catalog: CheckCatalog) -> Self {
        Self {
            inner: StaticCheckRegistry::new(catalog),
            failing: AtomicBool::new(false),
        }
    }

    pub async fn replace(&self, catalog: CheckCatalog) {
        self.inner.replace(catalog).await;
    }
}

#[async_trait]
impl CheckRegistry for ToggleRegistry {
    async fn load(&self) -> Result<CheckCatalog, RegistryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("catalog service down".to_string()));
        }
        self.inner.load().await
    }
}

pub fn security_catalog() -> CheckCatalog {
    CheckCatalog::new(vec![
        HealthCheckDefinition::new("phi-encryption", "PHI encryption at rest", "security")
            .with_compliance_requirement("HIPAA 164.312(a)(2)(iv)"),
        HealthCheckDefinition::new("mfa-coverage", "MFA coverage", "security"),
        HealthCheckDefinition::new("audit-log", "Audit log integrity", "security")
            .with_auto_fix(Some("10 minutes".to_string())),
    ])
    .with_categories(vec!["security".to_string(), "compliance".to_string()])
}

pub struct TestEngine {
    pub engine: Arc<HealthEngine>,
    pub runner: Arc<ScriptedRunner>,
    pub remediator: Arc<GatedRemediator>,
    pub registry: Arc<ToggleRegistry>,
}

pub fn build_engine(
    catalog: CheckCatalog,
    runner: ScriptedRunner,
    remediator: GatedRemediator,
    options: EngineOptions,
) -> TestEngine {
    let runner = Arc::new(runner);
    let remediator = Arc::new(remediator);
    let registry = Arc::new(ToggleRegistry::new(catalog));
    let engine = Arc::new(HealthEngine::new(
        registry.clone(),
        runner.clone(),
        remediator.clone(),
        options,
    ));
    TestEngine {
        engine,
        runner,
        remediator,
        registry,
    }
}

pub struct TestApp {
    pub address: String,
    pub engine: TestEngine,
}

// we have to run server in another task
pub async fn spawn_app(engine: TestEngine) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let server = platform_health::startup::run(listener, engine.engine.clone())
        .expect("Failed to bind address.");
    let _ = tokio::spawn(server);

    TestApp { address, engine }
}

pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
